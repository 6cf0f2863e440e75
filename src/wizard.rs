//! Wizard driver
//!
//! A wizard is created on the server, shows one form per state and ends
//! when a transition returns no view. Each form is an ordinary
//! [`FormSession`] seeded with the state's defaults.

use crate::api::{TrytonApi, WizardButton, WizardInstance, WizardStepResult, WizardView};
use crate::error::{ConsoleError, Result};
use crate::form::{FormSession, hydrate};
use log::{debug, info, warn};
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub enum WizardPhase {
    Form {
        state: String,
        form: FormSession,
        buttons: Vec<WizardButton>,
    },
    Finished {
        actions: Vec<Value>,
    },
}

#[derive(Debug, Clone)]
pub struct WizardSession {
    wizard: String,
    instance: WizardInstance,
    phase: WizardPhase,
    relation_page_size: usize,
}

impl WizardSession {
    /// Create the server-side instance and run its start state
    pub async fn start(api: &dyn TrytonApi, wizard: &str, relation_page_size: usize) -> Result<Self> {
        let instance = api.create_wizard_instance(wizard).await?;
        info!("Started wizard {} (instance {})", wizard, instance.id);

        let mut session = Self {
            wizard: wizard.to_string(),
            instance,
            phase: WizardPhase::Finished { actions: Vec::new() },
            relation_page_size,
        };
        let first = match api.get_wizard_form(wizard, &session.instance).await {
            Ok(result) => result,
            Err(e) => {
                session.discard_instance(api).await;
                return Err(e);
            }
        };
        session.apply(api, first).await;
        Ok(session)
    }

    pub fn wizard(&self) -> &str {
        &self.wizard
    }

    pub fn instance(&self) -> &WizardInstance {
        &self.instance
    }

    pub fn phase(&self) -> &WizardPhase {
        &self.phase
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.phase, WizardPhase::Finished { .. })
    }

    pub fn form(&self) -> Option<&FormSession> {
        match &self.phase {
            WizardPhase::Form { form, .. } => Some(form),
            WizardPhase::Finished { .. } => None,
        }
    }

    pub fn form_mut(&mut self) -> Option<&mut FormSession> {
        match &mut self.phase {
            WizardPhase::Form { form, .. } => Some(form),
            WizardPhase::Finished { .. } => None,
        }
    }

    pub fn buttons(&self) -> &[WizardButton] {
        match &self.phase {
            WizardPhase::Form { buttons, .. } => buttons,
            WizardPhase::Finished { .. } => &[],
        }
    }

    /// Press the button leading to `button_state`. Validation errors are
    /// recorded on the form and the form stays as it was.
    pub async fn press(&mut self, api: &dyn TrytonApi, button_state: &str) -> Result<()> {
        let WizardPhase::Form { state, form, buttons } = &mut self.phase else {
            return Err(ConsoleError::validation("the wizard has already finished"));
        };
        let button = buttons
            .iter()
            .find(|b| b.state == button_state)
            .ok_or_else(|| ConsoleError::not_found(format!("wizard button '{}'", button_state)))?;

        if button.validate {
            form.check_required()?;
        }
        let payload = form.to_wire_payload();
        let form_state = state.clone();

        debug!("Wizard {}: {} -> {}", self.wizard, form_state, button_state);
        let result = api
            .execute_wizard_step(&self.wizard, &self.instance, &form_state, button_state, &payload)
            .await;
        match result {
            Ok(next) => {
                self.apply(api, next).await;
                Ok(())
            }
            Err(e) => {
                if !form.apply_server_error(&e) && e.is_auth_expired() {
                    self.phase = WizardPhase::Finished { actions: Vec::new() };
                }
                Err(e)
            }
        }
    }

    /// Abandon the wizard
    pub async fn cancel(&mut self, api: &dyn TrytonApi) {
        if !self.is_finished() {
            self.discard_instance(api).await;
            self.phase = WizardPhase::Finished { actions: Vec::new() };
        }
    }

    async fn apply(&mut self, api: &dyn TrytonApi, result: WizardStepResult) {
        match result {
            WizardStepResult::Continue(view) => {
                self.phase = self.open_view(api, view).await;
            }
            WizardStepResult::Success { actions } => {
                info!("Wizard {} finished with {} action(s)", self.wizard, actions.len());
                self.discard_instance(api).await;
                self.phase = WizardPhase::Finished { actions };
            }
        }
    }

    async fn open_view(&self, api: &dyn TrytonApi, view: WizardView) -> WizardPhase {
        let mut form = FormSession::open_with_defaults(Arc::new(view.architecture), &view.defaults);
        if let Err(e) = hydrate::hydrate(api, &mut form, self.relation_page_size).await {
            warn!("Wizard form '{}' opened with incomplete data: {}", view.state, e);
        }
        WizardPhase::Form {
            state: view.state,
            form,
            buttons: view.buttons,
        }
    }

    async fn discard_instance(&self, api: &dyn TrytonApi) {
        if let Err(e) = api.delete_wizard_instance(&self.wizard, &self.instance).await {
            warn!("Failed to delete wizard instance {}: {}", self.instance.id, e);
        }
    }
}
