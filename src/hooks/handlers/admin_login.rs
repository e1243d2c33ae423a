//! Email notification on administration control panel logins

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Utc};

use crate::hooks::{
    Effect, Effects, EmailRequest, HookContext, HookHandler, HookPayload, HookResult,
    HostEvent, LoginRedirectEvent, MailConfig, SecurityConfig,
};

/// Sends the board contact an email for every ACP login
///
/// Not gated on watch groups: anyone reaching the ACP is reported.
pub struct AdminLoginHandler {
    name: String,
    mail: MailConfig,
}

impl AdminLoginHandler {
    pub fn new(name: impl Into<String>, mail: MailConfig) -> Self {
        Self {
            name: name.into(),
            mail,
        }
    }

    pub fn plan(&self, context: &HookContext, event: &LoginRedirectEvent) -> Effects {
        let security = SecurityConfig::load(context.config());
        if !security.admin_login_email_enabled || !event.admin {
            return Effects::none();
        }

        let to_address = security.notification_address().to_string();
        tracing::info!(
            user_id = context.user_id(),
            username = %context.username(),
            to = %to_address,
            "Sending ACP login notification"
        );

        Effects::none().with(Effect::SendEmail(EmailRequest {
            extension: self.mail.extension.clone(),
            template: self.mail.template.clone(),
            locale: self.mail.locale.clone(),
            to_address,
            to_name: security.board_contact_name,
            vars: BTreeMap::from([
                ("USERNAME".to_string(), context.username().to_string()),
                ("IP_ADDRESS".to_string(), context.ip_address().to_string()),
                ("LOGIN_TIME".to_string(), format_login_time(context.now())),
            ]),
        }))
    }
}

impl HookHandler for AdminLoginHandler {
    fn execute(&self, context: &HookContext, payload: &HookPayload) -> HookResult<Effects> {
        match &payload.event {
            HostEvent::LoginRedirect(event) => Ok(self.plan(context, event)),
            _ => Ok(Effects::none()),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn should_run(&self, _context: &HookContext, payload: &HookPayload) -> bool {
        matches!(payload.event, HostEvent::LoginRedirect(_))
    }
}

/// `Sunday 18th of October 2026 at 03:04:05 PM`
pub fn format_login_time(at: DateTime<Utc>) -> String {
    let day = at.day();
    format!(
        "{} {}{} of {} at {}",
        at.format("%A"),
        day,
        ordinal_suffix(day),
        at.format("%B %Y"),
        at.format("%I:%M:%S %p"),
    )
}

fn ordinal_suffix(day: u32) -> &'static str {
    match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::{settings, MemoryConfigStore};
    use chrono::TimeZone;
    use std::sync::Arc;

    fn handler() -> AdminLoginHandler {
        AdminLoginHandler::new("acp_login_notification", MailConfig::default())
    }

    fn context(pairs: &[(&str, &str)]) -> HookContext {
        let mut values = vec![
            (settings::SEC_LOGIN_EMAIL, "1"),
            (settings::BOARD_CONTACT, "board@example.com"),
            (settings::BOARD_CONTACT_NAME, "Example Board"),
        ];
        values.extend_from_slice(pairs);

        HookContext::builder()
            .with_user_id(2)
            .with_username("admin")
            .with_ip_address("203.0.113.9")
            .with_time(Utc.with_ymd_and_hms(2026, 10, 18, 15, 4, 5).unwrap())
            .with_config(Arc::new(MemoryConfigStore::from_pairs(values)))
            .build()
    }

    fn recipient(effects: Effects) -> Option<String> {
        effects.into_iter().find_map(|effect| match effect {
            Effect::SendEmail(request) => Some(request.to_address),
            _ => None,
        })
    }

    #[test]
    fn test_format_login_time() {
        let at = Utc.with_ymd_and_hms(2026, 10, 18, 15, 4, 5).unwrap();
        assert_eq!(format_login_time(at), "Sunday 18th of October 2026 at 03:04:05 PM");

        let at = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 9).unwrap();
        assert_eq!(format_login_time(at), "Sunday 1st of March 2026 at 12:00:09 AM");
    }

    #[test]
    fn test_ordinal_suffix() {
        let cases = [
            (1, "st"), (2, "nd"), (3, "rd"), (4, "th"), (11, "th"), (12, "th"),
            (13, "th"), (21, "st"), (22, "nd"), (23, "rd"), (30, "th"), (31, "st"),
        ];
        for (day, suffix) in cases {
            assert_eq!(ordinal_suffix(day), suffix, "day {day}");
        }
    }

    #[test]
    fn test_admin_login_sends_to_board_contact() {
        let effects: Vec<_> = handler()
            .plan(&context(&[]), &LoginRedirectEvent::new(true))
            .into_iter()
            .collect();

        assert_eq!(
            effects,
            vec![Effect::SendEmail(EmailRequest {
                extension: "phpbb/teamsecurity".to_string(),
                template: "acp_login".to_string(),
                locale: "en".to_string(),
                to_address: "board@example.com".to_string(),
                to_name: "Example Board".to_string(),
                vars: BTreeMap::from([
                    ("USERNAME".to_string(), "admin".to_string()),
                    ("IP_ADDRESS".to_string(), "203.0.113.9".to_string()),
                    (
                        "LOGIN_TIME".to_string(),
                        "Sunday 18th of October 2026 at 03:04:05 PM".to_string()
                    ),
                ]),
            })]
        );
    }

    #[test]
    fn test_security_contact_takes_precedence() {
        let effects = handler().plan(
            &context(&[(settings::SEC_CONTACT, "security@example.com")]),
            &LoginRedirectEvent::new(true),
        );
        assert_eq!(recipient(effects).as_deref(), Some("security@example.com"));
    }

    #[test]
    fn test_falsy_security_contact_falls_back() {
        for contact in ["", "  ", "0"] {
            let effects = handler().plan(
                &context(&[(settings::SEC_CONTACT, contact)]),
                &LoginRedirectEvent::new(true),
            );
            assert_eq!(recipient(effects).as_deref(), Some("board@example.com"), "contact {contact:?}");
        }
    }

    #[test]
    fn test_no_email_when_gated() {
        assert!(handler()
            .plan(&context(&[]), &LoginRedirectEvent::new(false))
            .is_empty());
        assert!(handler()
            .plan(&context(&[(settings::SEC_LOGIN_EMAIL, "0")]), &LoginRedirectEvent::new(true))
            .is_empty());
    }
}
