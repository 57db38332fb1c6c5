//! Notification templates.
//!
//! Templates are plain data (`{{name}}` placeholders plus a list of declared
//! variables) and are validated when the table is built: every placeholder
//! must be declared and every declared variable must be used. Rendering a
//! validated template cannot fail; a declared variable with no value renders
//! as an empty string.

use crate::domain::notification::NotificationKind;
use crate::error::{LoyaltyError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Variables the dispatcher supplies for every event.
pub const AMBIENT_VARIABLES: [&str; 2] = ["customerName", "storeName"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailTemplate {
    pub kind: NotificationKind,
    pub subject: String,
    pub body: String,
    pub variables: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedTemplate {
    pub subject: String,
    pub body: String,
    /// Declared variables that had no value and rendered empty.
    pub missing: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
enum Part {
    Text(String),
    Var(String),
}

fn parse(text: &str) -> Result<Vec<Part>> {
    let mut parts = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find("{{") {
        if start > 0 {
            parts.push(Part::Text(rest[..start].to_string()));
        }
        let after = &rest[start + 2..];
        let end = after
            .find("}}")
            .ok_or_else(|| LoyaltyError::Template(format!("unterminated placeholder in {text:?}")))?;
        let name = after[..end].trim();
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(LoyaltyError::Template(format!(
                "invalid placeholder {:?}",
                &after[..end]
            )));
        }
        parts.push(Part::Var(name.to_string()));
        rest = &after[end + 2..];
    }
    if !rest.is_empty() {
        parts.push(Part::Text(rest.to_string()));
    }
    Ok(parts)
}

fn render_parts(parts: &[Part], values: &HashMap<&str, String>, missing: &mut BTreeSet<String>) -> String {
    let mut out = String::new();
    for part in parts {
        match part {
            Part::Text(text) => out.push_str(text),
            Part::Var(name) => match values.get(name.as_str()) {
                Some(value) => out.push_str(value),
                None => {
                    missing.insert(name.clone());
                }
            },
        }
    }
    out
}

#[derive(Debug, Clone)]
struct CompiledTemplate {
    subject: Vec<Part>,
    body: Vec<Part>,
}

impl CompiledTemplate {
    fn compile(template: &EmailTemplate) -> Result<Self> {
        let subject = parse(&template.subject)?;
        let body = parse(&template.body)?;

        let declared: BTreeSet<&str> = template.variables.iter().map(String::as_str).collect();
        let used: BTreeSet<&str> = subject
            .iter()
            .chain(&body)
            .filter_map(|part| match part {
                Part::Var(name) => Some(name.as_str()),
                Part::Text(_) => None,
            })
            .collect();

        if let Some(undeclared) = used.difference(&declared).next() {
            return Err(LoyaltyError::Template(format!(
                "{} template uses undeclared placeholder {{{{{undeclared}}}}}",
                template.kind
            )));
        }
        if let Some(unused) = declared.difference(&used).next() {
            return Err(LoyaltyError::Template(format!(
                "{} template declares {unused} but never uses it",
                template.kind
            )));
        }

        Ok(Self { subject, body })
    }

    fn render(&self, values: &HashMap<&str, String>) -> RenderedTemplate {
        let mut missing = BTreeSet::new();
        let subject = render_parts(&self.subject, values, &mut missing);
        let body = render_parts(&self.body, values, &mut missing);
        RenderedTemplate {
            subject,
            body,
            missing: missing.into_iter().collect(),
        }
    }
}

/// Validated templates, at most one per notification kind.
#[derive(Debug, Clone)]
pub struct TemplateTable {
    templates: HashMap<NotificationKind, CompiledTemplate>,
}

impl TemplateTable {
    pub fn new(templates: Vec<EmailTemplate>) -> Result<Self> {
        let mut compiled = HashMap::new();
        for template in &templates {
            if compiled
                .insert(template.kind, CompiledTemplate::compile(template)?)
                .is_some()
            {
                return Err(LoyaltyError::Template(format!(
                    "duplicate template for {}",
                    template.kind
                )));
            }
        }
        Ok(Self {
            templates: compiled,
        })
    }

    /// The built-in English templates, one per notification kind.
    pub fn defaults() -> Result<Self> {
        Self::new(default_templates())
    }

    pub fn contains(&self, kind: NotificationKind) -> bool {
        self.templates.contains_key(&kind)
    }

    /// `None` when no template is registered for `kind`.
    pub fn render(&self, kind: NotificationKind, values: &HashMap<&str, String>) -> Option<RenderedTemplate> {
        self.templates.get(&kind).map(|t| t.render(values))
    }
}

fn template(kind: NotificationKind, subject: &str, body: &str, variables: &[&str]) -> EmailTemplate {
    EmailTemplate {
        kind,
        subject: subject.to_string(),
        body: body.to_string(),
        variables: variables.iter().map(|v| v.to_string()).collect(),
    }
}

pub fn default_templates() -> Vec<EmailTemplate> {
    vec![
        template(
            NotificationKind::PointsEarned,
            "You earned {{points}} points!",
            "Hi {{customerName}},\n\n\
             You just earned {{points}} points at {{storeName}} for {{activityDescription}}.\n\n\
             Your new balance is {{totalPoints}} points.\n\n\
             Thanks for your loyalty,\nThe {{storeName}} team",
            &["points", "customerName", "storeName", "activityDescription", "totalPoints"],
        ),
        template(
            NotificationKind::TierUpgrade,
            "Congratulations! You reached {{newTier}}",
            "Congratulations {{customerName}}!\n\n\
             You moved up from {{oldTier}} to {{newTier}} in our loyalty program.\n\n\
             Your benefits now include:\n{{benefits}}\n\n\
             Enjoy your VIP experience,\nThe {{storeName}} team",
            &["newTier", "customerName", "oldTier", "benefits", "storeName"],
        ),
        template(
            NotificationKind::RewardRedeemed,
            "Your {{rewardName}} is ready",
            "Hi {{customerName}},\n\n\
             Your reward code is {{rewardCode}}.\n\n\
             {{rewardInstructions}}\n\n\
             The {{storeName}} team",
            &["rewardName", "customerName", "rewardCode", "rewardInstructions", "storeName"],
        ),
        template(
            NotificationKind::ReferralSuccess,
            "{{referredName}} joined thanks to you!",
            "Hi {{customerName}},\n\n\
             {{referredName}} accepted your invitation and you earned {{points}} points.\n\n\
             The {{storeName}} team",
            &["referredName", "customerName", "points", "storeName"],
        ),
        template(
            NotificationKind::BirthdayComing,
            "Your birthday is coming up, {{customerName}}!",
            "Hi {{customerName}},\n\n\
             Your birthday is {{daysUntil}} days away. Stop by {{storeName}} for a treat.\n\n\
             The {{storeName}} team",
            &["customerName", "daysUntil", "storeName"],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&'static str, &str)]) -> HashMap<&'static str, String> {
        pairs.iter().map(|(k, v)| (*k, v.to_string())).collect()
    }

    #[test]
    fn test_defaults_are_valid_and_complete() {
        let table = TemplateTable::defaults().expect("default templates must validate");
        for kind in NotificationKind::ALL {
            assert!(table.contains(kind), "no default template for {kind}");
        }
    }

    #[test]
    fn test_render_substitutes_every_occurrence() {
        let table = TemplateTable::defaults().unwrap();
        let rendered = table
            .render(
                NotificationKind::PointsEarned,
                &values(&[
                    ("points", "150"),
                    ("totalPoints", "1050"),
                    ("activityDescription", "Order #1001"),
                    ("customerName", "Ana"),
                    ("storeName", "Tumatera"),
                ]),
            )
            .unwrap();

        assert_eq!(rendered.subject, "You earned 150 points!");
        assert!(rendered.body.starts_with("Hi Ana,"));
        assert!(rendered.body.contains("balance is 1050 points"));
        assert!(rendered.body.ends_with("The Tumatera team"));
        assert!(rendered.missing.is_empty());
    }

    #[test]
    fn test_missing_value_renders_empty() {
        let table = TemplateTable::new(vec![template(
            NotificationKind::BirthdayComing,
            "Hi {{customerName}}",
            "In {{daysUntil}} days",
            &["customerName", "daysUntil"],
        )])
        .unwrap();

        let rendered = table
            .render(NotificationKind::BirthdayComing, &values(&[("customerName", "Ana")]))
            .unwrap();
        assert_eq!(rendered.body, "In  days");
        assert_eq!(rendered.missing, vec!["daysUntil".to_string()]);
    }

    #[test]
    fn test_values_are_not_reinterpreted() {
        let table = TemplateTable::new(vec![template(
            NotificationKind::ReferralSuccess,
            "{{referredName}}",
            "{{points}}",
            &["referredName", "points"],
        )])
        .unwrap();
        let rendered = table
            .render(
                NotificationKind::ReferralSuccess,
                &values(&[("referredName", "{{points}}"), ("points", "5")]),
            )
            .unwrap();
        assert_eq!(rendered.subject, "{{points}}");
    }

    #[test]
    fn test_undeclared_placeholder_rejected() {
        let result = TemplateTable::new(vec![template(
            NotificationKind::PointsEarned,
            "You earned {{points}}",
            "Next reward: {{nextRewardName}}",
            &["points"],
        )]);
        assert!(matches!(result, Err(LoyaltyError::Template(msg)) if msg.contains("nextRewardName")));
    }

    #[test]
    fn test_unused_declaration_rejected() {
        let result = TemplateTable::new(vec![template(
            NotificationKind::PointsEarned,
            "You earned {{points}}",
            "Thanks",
            &["points", "pointsToNextReward"],
        )]);
        assert!(matches!(result, Err(LoyaltyError::Template(msg)) if msg.contains("pointsToNextReward")));
    }

    #[test]
    fn test_malformed_placeholders_rejected() {
        for bad in ["Hi {{customerName", "Hi {{}}", "Hi {{#if x}}"] {
            let result = TemplateTable::new(vec![template(
                NotificationKind::PointsEarned,
                bad,
                "",
                &["customerName"],
            )]);
            assert!(matches!(result, Err(LoyaltyError::Template(_))), "{bad} accepted");
        }
    }

    #[test]
    fn test_duplicate_kind_rejected() {
        let t = template(NotificationKind::PointsEarned, "{{points}}", "", &["points"]);
        let result = TemplateTable::new(vec![t.clone(), t]);
        assert!(matches!(result, Err(LoyaltyError::Template(msg)) if msg.contains("duplicate")));
    }

    #[test]
    fn test_unknown_kind_has_no_template() {
        let table = TemplateTable::new(Vec::new()).unwrap();
        assert!(table.render(NotificationKind::TierUpgrade, &HashMap::new()).is_none());
    }
}
