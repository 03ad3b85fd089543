use anyhow::{anyhow, bail, Result};
use std::cell::Ref;
use std::time::Duration;
use tracing::{error, info};

use crate::error::SettingsError;
use crate::host::Host;
use crate::interceptor::{Interceptor, SubscriptionId};
use crate::session::{Session, SessionHandle};
use crate::settings::{SettingField, SettingValue};

type InitStep<H> = fn(&mut AutoClicker<H>) -> Result<()>;

/// Wires a session to a host page and drives it.
pub struct AutoClicker<H: Host> {
    session: SessionHandle,
    host: H,
    observing_mutations: bool,
    subscription: Option<SubscriptionId>,
}

impl<H: Host> AutoClicker<H> {
    /// Install the clicker on `host`.
    ///
    /// Each init step that fails is logged and skipped, the rest still run,
    /// so a page missing its root container keeps clicking elements and
    /// polling controls without round-completion detection.
    pub fn install(host: H, session: Session) -> Self {
        let mut clicker = Self {
            session: session.into_handle(),
            host,
            observing_mutations: false,
            subscription: None,
        };

        let steps: [(&str, InitStep<H>); 4] = [
            ("observe round completion", Self::observe_round_completion),
            ("intercept elements", Self::intercept_elements),
            ("start polling", Self::start_polling),
            ("arm auto-play timer", Self::arm_autoplay),
        ];
        for (name, step) in steps {
            if let Err(err) = step(&mut clicker) {
                error!(step = name, error = %err, "autoclicker init step failed, continuing degraded");
            }
        }
        info!(
            observing_mutations = clicker.observing_mutations,
            intercepting = clicker.subscription.is_some(),
            "autoclicker installed"
        );
        clicker
    }

    fn observe_round_completion(&mut self) -> Result<()> {
        if !self.host.has_root() {
            bail!("root container not found");
        }
        self.observing_mutations = true;
        Ok(())
    }

    fn intercept_elements(&mut self) -> Result<()> {
        let interceptor = Interceptor::new(self.session.clone());
        let stream = self
            .host
            .element_stream()
            .ok_or_else(|| anyhow!("host exposes no element stream"))?;
        self.subscription = Some(interceptor.attach(stream));
        Ok(())
    }

    fn start_polling(&mut self) -> Result<()> {
        self.session.borrow_mut().start_polling();
        Ok(())
    }

    fn arm_autoplay(&mut self) -> Result<()> {
        let mut session = self.session.borrow_mut();
        if session.settings().auto_click_play {
            session.arm_autoplay_timer();
        }
        Ok(())
    }

    /// Advance virtual time by `span`, running every task that falls due.
    pub fn run_for(&mut self, span: Duration) {
        let horizon = self.now() + span;
        loop {
            let next = self.session.borrow_mut().scheduler.pop_due(horizon);
            let Some((id, task)) = next else {
                break;
            };
            self.session.borrow_mut().dispatch(id, task, &mut self.host);
        }
        self.session.borrow_mut().scheduler.advance_to(horizon);
    }

    /// Called by the host whenever its view changed.
    pub fn notify_mutation(&mut self) {
        if !self.observing_mutations {
            return;
        }
        self.session.borrow_mut().observe_mutation(&self.host);
    }

    pub fn pause(&mut self) {
        self.session.borrow_mut().pause();
    }

    pub fn resume(&mut self) {
        self.session.borrow_mut().resume();
    }

    pub fn toggle_pause(&mut self) -> bool {
        self.session.borrow_mut().toggle_pause()
    }

    pub fn update_setting(&mut self, field: SettingField, value: SettingValue) -> Result<(), SettingsError> {
        self.session.borrow_mut().update_setting(field, value)
    }

    pub fn update_setting_raw(&mut self, id: &str, raw: &str) -> Result<(), SettingsError> {
        self.session.borrow_mut().update_setting_raw(id, raw)
    }

    pub fn now(&self) -> Duration {
        self.session.borrow().now()
    }

    pub fn session(&self) -> Ref<'_, Session> {
        self.session.borrow()
    }

    pub fn handle(&self) -> SessionHandle {
        self.session.clone()
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn is_observing_mutations(&self) -> bool {
        self.observing_mutations
    }

    pub fn is_intercepting(&self) -> bool {
        self.subscription.is_some()
    }
}
