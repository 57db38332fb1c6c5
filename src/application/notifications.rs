use super::templates::TemplateTable;
use crate::domain::notification::NotificationEvent;
use crate::domain::ports::{NotificationDispatcher, NotificationSinkBox, OutboundMessage};
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::{debug, error, warn};

/// Renders events through the template table and hands them to a sink.
///
/// Every failure (no template, delivery error) is logged and absorbed here.
pub struct TemplateDispatcher {
    templates: TemplateTable,
    store_name: String,
    sink: NotificationSinkBox,
}

impl TemplateDispatcher {
    pub fn new(templates: TemplateTable, store_name: impl Into<String>, sink: NotificationSinkBox) -> Self {
        Self {
            templates,
            store_name: store_name.into(),
            sink,
        }
    }
}

#[async_trait]
impl NotificationDispatcher for TemplateDispatcher {
    async fn dispatch(&self, event: NotificationEvent) {
        let kind = event.kind();
        let customer = &event.customer;

        if !customer.notification_preferences.is_enabled(kind) {
            debug!(customer_id = %customer.id, %kind, "customer opted out, skipping notification");
            return;
        }

        let mut values: HashMap<&str, String> = event.payload.variables().into_iter().collect();
        values.insert("customerName", customer.name.clone());
        values.insert("storeName", self.store_name.clone());

        let Some(rendered) = self.templates.render(kind, &values) else {
            error!(%kind, "no template found for notification");
            return;
        };
        if !rendered.missing.is_empty() {
            warn!(%kind, missing = ?rendered.missing, "template variables rendered empty");
        }

        let message = OutboundMessage {
            to: customer.email.clone(),
            kind,
            subject: rendered.subject,
            body: rendered.body,
        };
        if let Err(e) = self.sink.deliver(message).await {
            error!(customer_id = %customer.id, %kind, error = %e, "notification delivery failed");
        }
    }
}
