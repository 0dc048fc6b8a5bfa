use std::sync::Arc;

use chrono::{Duration, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use tracing::{error, info, instrument, warn};

use crate::auth::{generate_reset_token, hash_password};
use crate::db::DbPool;
use crate::entities::user;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::mailer::MailerHandle;

const RESET_MAIL_SUBJECT: &str = "Reset your password";

fn build_reset_url(app_base_url: &str, token: &str) -> String {
    format!(
        "{}/reset-password?token={token}",
        app_base_url.trim_end_matches('/')
    )
}

fn build_reset_mail(reset_url: &str) -> String {
    format!(
        "<p>Someone requested a password reset for your account.</p>\
         <p><a href=\"{reset_url}\">Reset your password</a></p>\
         <p>This link expires in one hour. If you did not request a reset, you can ignore this email.</p>"
    )
}

/// Forgot-password and reset-password flows.
#[derive(Clone)]
pub struct PasswordResetService {
    db: Arc<DbPool>,
    mailer: MailerHandle,
    event_sender: Option<Arc<EventSender>>,
    app_base_url: String,
    token_ttl_secs: u64,
}

impl PasswordResetService {
    pub fn new(
        db: Arc<DbPool>,
        mailer: MailerHandle,
        event_sender: Option<Arc<EventSender>>,
        app_base_url: String,
        token_ttl_secs: u64,
    ) -> Self {
        Self {
            db,
            mailer,
            event_sender,
            app_base_url,
            token_ttl_secs,
        }
    }

    /// Issues a reset token and mails a reset link. Succeeds silently when no
    /// account matches `email` so callers cannot probe which addresses exist.
    #[instrument(skip(self))]
    pub async fn request_reset(&self, email: &str) -> Result<(), ServiceError> {
        let Some(existing) = user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(&*self.db)
            .await?
        else {
            info!("Password reset requested for unknown email");
            return Ok(());
        };

        let token = generate_reset_token();
        let expires_at = Utc::now() + Duration::seconds(self.token_ttl_secs as i64);

        let user_id = existing.id;
        let mut active: user::ActiveModel = existing.into();
        active.reset_token = Set(Some(token.clone()));
        active.reset_token_expires_at = Set(Some(expires_at));
        active.update(&*self.db).await?;

        let reset_url = build_reset_url(&self.app_base_url, &token);
        self.mailer
            .send(email, RESET_MAIL_SUBJECT, &build_reset_mail(&reset_url))
            .await
            .map_err(|e| {
                error!("Failed to send password reset mail: {e}");
                e
            })?;

        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(Event::PasswordResetRequested { user_id }).await {
                warn!("Failed to emit PasswordResetRequested event: {e}");
            }
        }

        Ok(())
    }

    /// Consumes a reset token and sets a new password. The token must match
    /// and be unexpired; it is cleared on success so it cannot be replayed.
    #[instrument(skip(self, token, new_password))]
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), ServiceError> {
        let now = Utc::now();
        let existing = user::Entity::find()
            .filter(user::Column::ResetToken.eq(token))
            .filter(user::Column::ResetTokenExpiresAt.gt(now))
            .one(&*self.db)
            .await?
            .ok_or(ServiceError::InvalidResetToken)?;

        let password_hash = hash_password(new_password)?;

        let user_id = existing.id;
        let mut active: user::ActiveModel = existing.into();
        active.password_hash = Set(password_hash);
        active.reset_token = Set(None);
        active.reset_token_expires_at = Set(None);
        active.update(&*self.db).await?;

        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(Event::PasswordResetCompleted { user_id }).await {
                warn!("Failed to emit PasswordResetCompleted event: {e}");
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_url_joins_without_double_slash() {
        assert_eq!(
            build_reset_url("http://localhost:3000", "abc"),
            "http://localhost:3000/reset-password?token=abc"
        );
        assert_eq!(
            build_reset_url("http://localhost:3000/", "abc"),
            "http://localhost:3000/reset-password?token=abc"
        );
    }

    #[test]
    fn reset_mail_embeds_link() {
        let html = build_reset_mail("http://localhost:3000/reset-password?token=abc");
        assert!(html.contains("href=\"http://localhost:3000/reset-password?token=abc\""));
    }
}
