use crate::lifecycle::JournalService;
use crate::models::{PageSettings, SettingField, TemplateVariant};
use crate::settings::SettingsObserver;
use std::sync::Weak;

/// Forwards settings changes to the service as mutations for one template
/// variant. The settings model holds exactly one of these at a time.
pub struct TemplateBinding {
    variant: TemplateVariant,
    service: Weak<JournalService>,
}

impl TemplateBinding {
    pub fn new(variant: TemplateVariant, service: Weak<JournalService>) -> Self {
        Self { variant, service }
    }

    pub fn variant(&self) -> TemplateVariant {
        self.variant
    }
}

impl SettingsObserver for TemplateBinding {
    fn on_setting_changed(&self, field: SettingField, settings: &PageSettings) {
        match self.service.upgrade() {
            Some(service) => service.submit_change(field, self.variant, settings.clone()),
            None => tracing::debug!(
                field = field.as_str(),
                "journal service dropped; ignoring settings change"
            ),
        }
    }
}
