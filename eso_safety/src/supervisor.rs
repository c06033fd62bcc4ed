//! Safety supervisor: the public contract of the safety I/O core.
//!
//! Owns the HAL, the channel monitors, the output supervisors, the fault
//! aggregator, the state machine and the event bus. Every operation is a
//! method on one owned [`SafetySupervisor`]; there is no module-level
//! state, so independent safety domains can coexist.
//!
//! ## Supervisory cycle
//!
//! ```text
//! stop latch → inputs → demands → outputs → faults (incl. watchdog) → feed
//! ```
//!
//! ## Output gate
//!
//! An output may be energized only while the state is `Operational`,
//! `safe_state_enforced` is false, no fault is active and no stop is
//! pending. The gate is evaluated before the HAL is touched.

use eso_common::clock::{Clock, MonotonicClock};
use eso_common::consts::{MAX_REACTION_TIME_MS, SAFETY_INPUT_CHANNELS, SAFETY_OUTPUT_CHANNELS};
use eso_common::hal::SafetyHal;
use eso_common::safety::event::reason;
use eso_common::safety::{
    DiagnosticsMask, EventRecord, FaultCode, InputType, SafetyError, SafetyEvent, SafetyFunction,
    SafetyInputConfig, SafetyInputStatus, SafetyOutputConfig, SafetyOutputStatus, SafetyState,
    SafetyStatistics, SafetySystemConfig, SafetySystemStatus,
};
use tracing::{debug, error, info, trace, warn};

use crate::events::{EventBus, EventQueue, ObserverId, SafetyObserver};
use crate::safety::fault::{FaultAggregator, FaultInputs, FaultReport, Watchdog};
use crate::safety::monitor::{ChannelMonitor, MonitorSettings};
use crate::safety::output::{OutputSupervisor, Permit};
use crate::shared::StopHandle;
use crate::state::machine::{SafetyStateMachine, Transition, Trigger};

/// Safety I/O supervisor for one safety domain.
pub struct SafetySupervisor<H: SafetyHal, C: Clock = MonotonicClock> {
    hal: H,
    clock: C,
    initialized: bool,
    config: SafetySystemConfig,
    settings: MonitorSettings,
    inputs: [ChannelMonitor; SAFETY_INPUT_CHANNELS],
    outputs: [OutputSupervisor; SAFETY_OUTPUT_CHANNELS],
    aggregator: FaultAggregator,
    watchdog: Watchdog,
    machine: SafetyStateMachine,
    events: EventBus,
    stop: StopHandle,
    status: SafetySystemStatus,
    /// Clock reading at `init()` [ms].
    epoch_ms: u64,
    reset_count: u32,
    cycle_count: u64,
    /// Safe state could not be reached; consumed by the next aggregation.
    internal_fault: bool,
}

impl<H: SafetyHal> SafetySupervisor<H, MonotonicClock> {
    /// Supervisor timed by the process monotonic clock.
    pub fn with_monotonic_clock(hal: H) -> Self {
        Self::new(hal, MonotonicClock::new())
    }
}

impl<H: SafetyHal, C: Clock> SafetySupervisor<H, C> {
    /// Uninitialized supervisor. Call [`init`](Self::init) before use.
    pub fn new(hal: H, clock: C) -> Self {
        let config = SafetySystemConfig::default();
        Self {
            hal,
            clock,
            initialized: false,
            settings: MonitorSettings::from_config(&config),
            watchdog: Watchdog::new(config.watchdog_timeout_ms, 0),
            config,
            inputs: core::array::from_fn(|ch| ChannelMonitor::new(ch as u8)),
            outputs: core::array::from_fn(|ch| OutputSupervisor::new(ch as u8)),
            aggregator: FaultAggregator::new(),
            machine: SafetyStateMachine::new(),
            events: EventBus::new(),
            stop: StopHandle::new(),
            status: SafetySystemStatus::default(),
            epoch_ms: 0,
            reset_count: 0,
            cycle_count: 0,
            internal_fault: false,
        }
    }

    // ─── Lifecycle ──────────────────────────────────────────────────

    /// Validate `config`, reset every channel and enter `Safe`.
    ///
    /// # Errors
    /// `AlreadyInitialized`, or the validation error of `config`.
    pub fn init(&mut self, config: SafetySystemConfig) -> Result<(), SafetyError> {
        if self.initialized {
            return Err(SafetyError::AlreadyInitialized);
        }
        config.validate()?;

        self.epoch_ms = self.clock.now_ms();
        self.settings = MonitorSettings::from_config(&config);
        self.watchdog = Watchdog::new(config.watchdog_timeout_ms, 0);
        self.inputs = core::array::from_fn(|ch| ChannelMonitor::new(ch as u8));
        self.outputs = core::array::from_fn(|ch| OutputSupervisor::new(ch as u8));
        self.aggregator = FaultAggregator::new();
        self.machine = SafetyStateMachine::new();
        self.internal_fault = false;
        self.stop.take();
        self.status = SafetySystemStatus {
            current_state: SafetyState::Safe,
            safe_state_enforced: true,
            watchdog_active: true,
            ..SafetySystemStatus::default()
        };
        self.config = config;
        self.initialized = true;

        self.deenergize_all();
        info!(
            "Safety supervisor initialized (category {}, test pulse {} ms, watchdog {} ms)",
            self.config.safety_category,
            self.config.test_pulse_interval_ms,
            self.config.watchdog_timeout_ms
        );
        Ok(())
    }

    /// De-energize every output and release the supervisor.
    pub fn deinit(&mut self) -> Result<(), SafetyError> {
        self.ensure_init()?;
        self.deenergize_all();
        self.initialized = false;
        info!("Safety supervisor deinitialized");
        Ok(())
    }

    #[inline]
    pub const fn is_initialized(&self) -> bool {
        self.initialized
    }

    // ─── Configuration ──────────────────────────────────────────────

    /// Configure one input channel. Locked while `Operational`.
    pub fn configure_input(&mut self, channel: u8, config: SafetyInputConfig) -> Result<(), SafetyError> {
        self.ensure_init()?;
        let ch = input_index(channel)?;
        self.ensure_unlocked()?;
        config.validate()?;
        debug!("Input {channel} configured as {:?}", config.input_type);
        self.inputs[ch].configure(config);
        Ok(())
    }

    /// Configure one output channel. Locked while `Operational`.
    pub fn configure_output(&mut self, channel: u8, config: SafetyOutputConfig) -> Result<(), SafetyError> {
        self.ensure_init()?;
        let ch = output_index(channel)?;
        self.ensure_unlocked()?;
        config.validate(self.config.safety_category)?;
        debug!("Output {channel} configured as {:?}", config.output_type);
        self.outputs[ch].configure(config);
        Ok(())
    }

    /// Replace the system configuration.
    ///
    /// The safe state is forced first (outputs off, `Safe` unless the system
    /// sits in `Stop`, `Fault` or `Emergency`, which keep their state until a
    /// reset); an invalid `config` then leaves the previous configuration in
    /// place.
    pub fn reconfigure(&mut self, config: SafetySystemConfig) -> Result<(), SafetyError> {
        self.ensure_init()?;
        self.service_stop_latch();

        self.deenergize_all();
        if !matches!(
            self.machine.state(),
            SafetyState::Stop | SafetyState::Fault | SafetyState::Emergency
        ) {
            self.transition(Trigger::EnterSafe)?;
        }
        self.status.safe_state_enforced = true;

        config.validate()?;
        for out in &self.outputs {
            out.config().validate(config.safety_category)?;
        }
        self.ensure_dual_channel_inputs(config.safety_category)?;
        self.settings = MonitorSettings::from_config(&config);
        self.watchdog.set_timeout(config.watchdog_timeout_ms);
        self.config = config;
        info!("Safety configuration replaced (category {})", self.config.safety_category);
        Ok(())
    }

    /// Change the safety category (1..=4). Locked while `Operational`;
    /// the category is unchanged on any error.
    pub fn set_category(&mut self, category: u8) -> Result<(), SafetyError> {
        self.ensure_init()?;
        if !(1..=4).contains(&category) {
            warn!("Rejected safety category {category}");
            return Err(SafetyError::InvalidCategory(category));
        }
        self.ensure_unlocked()?;

        let candidate = self.config.with_category(category);
        candidate.validate()?;
        for out in &self.outputs {
            out.config().validate(category)?;
        }
        self.ensure_dual_channel_inputs(category)?;
        self.config = candidate;
        info!("Safety category set to {category}");
        Ok(())
    }

    /// Enable or disable watchdog supervision. Locked while `Operational`.
    pub fn enable_supervision(&mut self, enabled: bool) -> Result<(), SafetyError> {
        self.ensure_init()?;
        self.ensure_unlocked()?;
        let now = self.now();
        self.watchdog.set_enabled(enabled, now);
        self.status.watchdog_active = enabled;
        info!("Watchdog supervision {}", if enabled { "enabled" } else { "disabled" });
        Ok(())
    }

    pub fn config(&self) -> &SafetySystemConfig {
        &self.config
    }

    pub fn input_config(&self, channel: u8) -> Result<&SafetyInputConfig, SafetyError> {
        Ok(self.inputs[input_index(channel)?].config())
    }

    pub fn output_config(&self, channel: u8) -> Result<&SafetyOutputConfig, SafetyError> {
        Ok(self.outputs[output_index(channel)?].config())
    }

    // ─── Status ─────────────────────────────────────────────────────

    pub fn input_status(&self, channel: u8) -> Result<SafetyInputStatus, SafetyError> {
        Ok(self.inputs[input_index(channel)?].status())
    }

    pub fn output_status(&self, channel: u8) -> Result<SafetyOutputStatus, SafetyError> {
        Ok(self.outputs[output_index(channel)?].status())
    }

    /// Aggregate status snapshot. No side effects.
    pub fn system_status(&self) -> SafetySystemStatus {
        let mut status = self.status;
        status.uptime_seconds = (self.now() / 1000) as u32;
        status.watchdog_active = self.initialized && self.watchdog.is_enabled();
        status
    }

    #[inline]
    pub fn state(&self) -> SafetyState {
        self.machine.state()
    }

    /// Safe state enforced and no fault active.
    pub fn is_safe_state(&self) -> bool {
        self.initialized && self.status.safe_state_enforced && self.status.fault_code.is_none()
    }

    pub fn statistics(&self) -> SafetyStatistics {
        SafetyStatistics {
            uptime_seconds: (self.now() / 1000) as u32,
            fault_count: self.status.fault_count,
            reset_count: self.reset_count,
            cycle_count: self.cycle_count,
        }
    }

    /// Logged events, oldest first.
    pub fn event_log(&self) -> Vec<EventRecord> {
        self.events.log()
    }

    // ─── Events ─────────────────────────────────────────────────────

    pub fn register_observer(&mut self, observer: Box<dyn SafetyObserver>) -> Result<ObserverId, SafetyError> {
        self.events.register(observer)
    }

    pub fn unregister_observer(&mut self, id: ObserverId) -> Result<(), SafetyError> {
        self.events.unregister(id)
    }

    /// Register a fresh bounded queue and return a handle to drain it.
    pub fn subscribe_queue(&mut self) -> Result<(EventQueue, ObserverId), SafetyError> {
        let queue = EventQueue::new();
        let id = self.events.register(Box::new(queue.clone()))?;
        Ok((queue, id))
    }

    /// Lock-free stop latch bound to this supervisor.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    // ─── Output Control ─────────────────────────────────────────────

    /// Command one output. Energizing is refused, without touching the
    /// HAL, unless the output gate is open.
    pub fn set_output(&mut self, channel: u8, energize: bool) -> Result<(), SafetyError> {
        self.ensure_init()?;
        let ch = output_index(channel)?;
        self.service_stop_latch();

        let permit = self.output_permit();
        let now = self.now();
        let result = self.outputs[ch].set(&mut self.hal, energize, permit, now);
        match result {
            Err(SafetyError::HardwareWrite(_)) if !energize => {
                self.internal_fault = true;
                self.evaluate_faults();
            }
            Err(err) => warn!("Output {channel} command rejected: {err}"),
            Ok(()) => {}
        }
        result
    }

    /// Unconditional emergency stop.
    ///
    /// Opens the HAL emergency-stop circuit, de-energizes every output and
    /// enters `Emergency`. Repeated calls leave the system in the same
    /// state.
    ///
    /// # Errors
    /// `NotInitialized`, or `EmergencyStopFailed` when the HAL circuit
    /// reported failure (the state change still happens and an internal
    /// fault is latched).
    pub fn force_stop(&mut self, reason: &str) -> Result<(), SafetyError> {
        self.ensure_init()?;
        self.stop.take();
        if self.emergency_stop(reason, None) {
            Ok(())
        } else {
            Err(SafetyError::EmergencyStopFailed)
        }
    }

    /// Move to `Reset`. Requires `fault_code == None`.
    pub fn request_reset(&mut self) -> Result<(), SafetyError> {
        self.ensure_init()?;
        self.service_stop_latch();
        self.ensure_no_fault()?;

        if !self.deenergize_all() {
            self.evaluate_faults();
            return Err(SafetyError::FaultActive(self.status.fault_code));
        }
        self.transition(Trigger::Reset)?;
        self.status.safe_state_enforced = true;
        self.reset_count = self.reset_count.wrapping_add(1);
        info!("Safety reset requested (reset #{})", self.reset_count);
        self.publish(SafetyEvent::ResetRequest, None, "reset requested");
        Ok(())
    }

    /// Controlled de-energize into `Safe`. Refused in `Stop`, `Fault` and
    /// `Emergency`, which leave only through a reset.
    pub fn enter_safety_mode(&mut self) -> Result<(), SafetyError> {
        self.ensure_init()?;
        self.service_stop_latch();
        self.transition(Trigger::EnterSafe)?;
        self.deenergize_all();
        self.status.safe_state_enforced = true;
        info!("Entered safety mode");
        Ok(())
    }

    /// Resume operation. Outputs stay off until re-commanded.
    pub fn exit_safety_mode(&mut self) -> Result<(), SafetyError> {
        self.ensure_init()?;
        self.service_stop_latch();
        self.ensure_no_fault()?;
        if !self.watchdog.is_enabled() {
            return Err(SafetyError::SupervisionDisabled);
        }
        if let Some(mon) = self.inputs.iter().find(|m| m.is_demanding()) {
            warn!("Cannot resume: input {} still demands a stop", mon.channel());
            return Err(SafetyError::DemandActive(mon.channel()));
        }
        self.transition(Trigger::Resume)?;
        self.status.safe_state_enforced = false;
        info!("Exited safety mode");
        Ok(())
    }

    // ─── Faults ─────────────────────────────────────────────────────

    /// Clear a locally clearable fault class.
    ///
    /// Only `None`, `InputStuck` and `OutputFeedback` are accepted; every
    /// other class needs [`restart`](Self::restart).
    pub fn clear_fault(&mut self, code: FaultCode) -> Result<(), SafetyError> {
        self.ensure_init()?;
        match code {
            FaultCode::None => return Ok(()),
            FaultCode::InputStuck => self.inputs.iter_mut().for_each(ChannelMonitor::clear_stuck),
            FaultCode::OutputFeedback => self
                .outputs
                .iter_mut()
                .for_each(OutputSupervisor::clear_feedback),
            other => {
                warn!("Fault {other} cannot be cleared locally");
                return Err(SafetyError::FaultNotClearable(other));
            }
        }
        self.evaluate_faults();
        info!("Cleared {code}; active fault now {}", self.status.fault_code);
        Ok(())
    }

    /// [`clear_fault`](Self::clear_fault) for a raw register value.
    pub fn clear_fault_code(&mut self, raw: u8) -> Result<(), SafetyError> {
        let code = FaultCode::from_u8(raw).ok_or(SafetyError::UnknownFaultCode(raw))?;
        self.clear_fault(code)
    }

    /// Full restart after external inspection: clears every latch, re-arms
    /// monitors and watchdog and returns to `Safe`. Counters survive.
    pub fn restart(&mut self) -> Result<(), SafetyError> {
        self.ensure_init()?;
        self.stop.take();
        let now = self.now();

        self.inputs.iter_mut().for_each(ChannelMonitor::rearm);
        self.outputs.iter_mut().for_each(OutputSupervisor::rearm);
        self.aggregator.rearm();
        self.internal_fault = false;
        self.watchdog.feed(now);
        self.deenergize_all();

        self.transition(Trigger::Restart)?;
        self.status.fault_code = FaultCode::None;
        self.status.safe_state_enforced = true;
        self.reset_count = self.reset_count.wrapping_add(1);
        info!("Safety supervisor restarted (reset #{})", self.reset_count);
        self.publish(SafetyEvent::ResetRequest, None, "full restart");

        // Conditions still present fault again right away.
        self.evaluate_faults();
        Ok(())
    }

    /// Re-evaluate every channel and output without feeding the watchdog.
    pub fn run_diagnostics(&mut self) -> DiagnosticsMask {
        if !self.initialized {
            return DiagnosticsMask::NOT_INITIALIZED;
        }
        self.service_stop_latch();
        self.sample_inputs();
        self.react_to_demands();
        self.supervise_outputs();
        self.evaluate_faults();

        let mut mask = DiagnosticsMask::CLEAR;
        for (ch, mon) in self.inputs.iter().enumerate() {
            if mon.status().fault {
                mask.set_input_fault(ch);
            }
        }
        for (ch, out) in self.outputs.iter().enumerate() {
            if out.status().fault {
                mask.set_output_fault(ch);
            }
        }
        if !self.status.fault_code.is_none() {
            mask.set_system_fault();
        }
        self.status.diagnostic_status = mask;
        debug!("Diagnostics mask 0x{:04X}", mask.bits());
        mask
    }

    /// Re-evaluate one input; `Ok(true)` when it is fault-free.
    pub fn test_input(&mut self, channel: u8) -> Result<bool, SafetyError> {
        self.ensure_init()?;
        let ch = input_index(channel)?;
        let now = self.now();
        let status = self.inputs[ch].update(&mut self.hal, now, &self.settings);
        self.evaluate_faults();
        Ok(!status.fault)
    }

    /// Re-evaluate one output; `Ok(true)` when it is fault-free.
    pub fn test_output(&mut self, channel: u8) -> Result<bool, SafetyError> {
        self.ensure_init()?;
        let ch = output_index(channel)?;
        let now = self.now();
        let status = self.outputs[ch].supervise(&mut self.hal, now, self.config.test_pulse_interval_ms);
        self.evaluate_faults();
        Ok(!status.fault)
    }

    /// Arm the stuck-at proof test of one input: it must change state
    /// within `fault_reset_time_ms`.
    pub fn expect_cycle(&mut self, channel: u8) -> Result<(), SafetyError> {
        self.ensure_init()?;
        let ch = input_index(channel)?;
        if !self.inputs[ch].config().enabled {
            return Err(SafetyError::ChannelDisabled(channel));
        }
        let now = self.now();
        self.inputs[ch].expect_cycle(now, self.config.fault_reset_time_ms);
        debug!("Input {channel}: proof test armed");
        Ok(())
    }

    /// Check that `function` is implemented by healthy inputs wired for
    /// the configured category within the reaction-time budget.
    pub fn validate_function(&self, function: SafetyFunction) -> Result<(), SafetyError> {
        self.ensure_init()?;
        let category = self.config.safety_category;
        let mut served = false;

        for mon in self.inputs.iter() {
            let cfg = mon.config();
            if !cfg.enabled || !function.served_by(cfg.input_type) {
                continue;
            }
            served = true;
            if mon.status().fault {
                return Err(SafetyError::ValidationFailed("serving input is faulted"));
            }
            if category >= 3 && !cfg.dual_channel {
                return Err(SafetyError::ValidationFailed(
                    "category 3+ requires dual-channel inputs",
                ));
            }
            let reaction = cfg.debounce_time_ms.saturating_add(self.config.test_pulse_interval_ms);
            if reaction > MAX_REACTION_TIME_MS {
                return Err(SafetyError::ValidationFailed(
                    "worst-case reaction time exceeds limit",
                ));
            }
        }

        if served {
            Ok(())
        } else {
            Err(SafetyError::ValidationFailed("no enabled input serves the function"))
        }
    }

    // ─── Supervisory Cycle ──────────────────────────────────────────

    /// One supervisory pass (test pulse). Returns the active fault code.
    pub fn cycle(&mut self) -> Result<FaultCode, SafetyError> {
        self.ensure_init()?;
        self.service_stop_latch();

        self.sample_inputs();
        self.react_to_demands();
        self.supervise_outputs();
        self.evaluate_faults();

        let now = self.now();
        if self.watchdog.is_enabled() {
            if self.hal.feed_watchdog() {
                self.watchdog.feed(now);
            } else {
                warn!("HAL watchdog retrigger failed");
            }
        }
        self.cycle_count = self.cycle_count.wrapping_add(1);
        trace!(
            "Cycle {} done: state {:?}, fault {:?}",
            self.cycle_count,
            self.machine.state(),
            self.status.fault_code
        );
        Ok(self.status.fault_code)
    }

    // ─── Internals ──────────────────────────────────────────────────

    /// Milliseconds since `init()`.
    fn now(&self) -> u64 {
        if self.initialized {
            self.clock.now_ms().saturating_sub(self.epoch_ms)
        } else {
            0
        }
    }

    fn ensure_init(&self) -> Result<(), SafetyError> {
        if self.initialized {
            Ok(())
        } else {
            Err(SafetyError::NotInitialized)
        }
    }

    fn ensure_unlocked(&self) -> Result<(), SafetyError> {
        if self.machine.state() == SafetyState::Operational {
            warn!("Configuration change rejected while operational");
            return Err(SafetyError::ConfigLocked);
        }
        Ok(())
    }

    fn ensure_no_fault(&self) -> Result<(), SafetyError> {
        match self.status.fault_code {
            FaultCode::None => Ok(()),
            code => Err(SafetyError::FaultActive(code)),
        }
    }

    fn output_permit(&self) -> Permit {
        if !self.status.fault_code.is_none() {
            Permit::Denied("fault active")
        } else if self.status.safe_state_enforced {
            Permit::Denied("safe state enforced")
        } else if self.machine.state() != SafetyState::Operational {
            Permit::Denied("system not operational")
        } else if self.stop.is_pending() {
            Permit::Denied("stop pending")
        } else {
            Permit::Granted
        }
    }

    fn transition(&mut self, trigger: Trigger) -> Result<SafetyState, SafetyError> {
        let from = self.machine.state();
        match self.machine.handle(trigger) {
            Transition::Ok(next) => {
                if next != from {
                    self.status.state_change_time = self.now();
                    info!("Safety state {from:?} -> {next:?}");
                }
                self.status.current_state = next;
                Ok(next)
            }
            Transition::Rejected(reason) => {
                warn!("Rejected {trigger:?} in state {from:?}: {reason}");
                Err(SafetyError::InvalidTransition { state: from, reason })
            }
        }
    }

    fn publish(&mut self, event: SafetyEvent, channel: Option<u8>, text: &str) {
        let now = self.now();
        self.status.last_event = event;
        self.status.event_timestamp = now;
        self.events.publish(EventRecord {
            event,
            timestamp_ms: now,
            state: self.status.current_state,
            fault: self.status.fault_code,
            channel,
            reason: reason(text),
        });
    }

    /// Write every output off. Returns `false` (and latches an internal
    /// fault) if any write failed.
    fn deenergize_all(&mut self) -> bool {
        let now = self.now();
        let mut ok = true;
        for out in self.outputs.iter_mut() {
            if out.set(&mut self.hal, false, Permit::Granted, now).is_err() {
                ok = false;
            }
        }
        if !ok {
            self.internal_fault = true;
        }
        ok
    }

    fn service_stop_latch(&mut self) {
        if self.stop.take() {
            warn!("Servicing pending stop request");
            self.emergency_stop("stop request", None);
        }
    }

    /// Forced stop path. Returns whether the HAL stop circuit reported success.
    fn emergency_stop(&mut self, text: &str, channel: Option<u8>) -> bool {
        let circuit_ok = self.hal.emergency_stop();
        let outputs_ok = self.deenergize_all();
        if !circuit_ok {
            self.internal_fault = true;
            error!("HAL emergency-stop circuit reported failure");
        }

        // Emergency is reachable from every state.
        let _ = self.transition(Trigger::EmergencyStop);
        self.status.safe_state_enforced = false;
        error!("EMERGENCY STOP: {text}");
        self.publish(SafetyEvent::EmergencyStop, channel, text);

        if !circuit_ok || !outputs_ok {
            self.evaluate_faults();
        }
        circuit_ok
    }

    fn sample_inputs(&mut self) {
        let now = self.now();
        for mon in self.inputs.iter_mut() {
            mon.update(&mut self.hal, now, &self.settings);
        }
    }

    fn supervise_outputs(&mut self) {
        let now = self.now();
        let test_pulse_ms = self.config.test_pulse_interval_ms;
        for out in self.outputs.iter_mut() {
            out.supervise(&mut self.hal, now, test_pulse_ms);
        }
    }

    /// Emergency-stop inputs force a stop from any state; other safety
    /// inputs stop an operating system.
    fn react_to_demands(&mut self) {
        let estop = self
            .inputs
            .iter()
            .find(|m| m.is_demanding() && m.config().input_type == InputType::EmergencyStop)
            .map(ChannelMonitor::channel);
        if let Some(ch) = estop {
            if self.machine.state() != SafetyState::Emergency {
                warn!("Emergency stop input {ch} activated");
                self.emergency_stop("emergency stop input", Some(ch));
            }
            return;
        }

        if self.machine.state() != SafetyState::Operational {
            return;
        }
        let demand = self
            .inputs
            .iter()
            .find(|m| m.is_demanding())
            .map(|m| (m.channel(), m.config().input_type));
        if let Some((ch, input_type)) = demand {
            warn!("Input {ch} ({input_type:?}) demands a safety stop");
            self.deenergize_all();
            if self.transition(Trigger::Demand).is_ok() {
                if self.config.enable_safe_state_enforcement {
                    self.status.safe_state_enforced = true;
                }
                self.publish(SafetyEvent::for_demand(input_type), Some(ch), "safety input demand");
            }
        }
    }

    /// First enabled stop-category input wired single-channel where
    /// `category` demands two channels.
    fn single_channel_stop_input(&self, category: u8) -> Option<u8> {
        self.inputs
            .iter()
            .find(|m| {
                let cfg = m.config();
                cfg.enabled && cfg.input_type.requires_dual_channel(category) && !cfg.dual_channel
            })
            .map(ChannelMonitor::channel)
    }

    fn ensure_dual_channel_inputs(&self, category: u8) -> Result<(), SafetyError> {
        match self.single_channel_stop_input(category) {
            Some(ch) => {
                warn!("Input {ch} must be dual-channel at category {category}");
                Err(SafetyError::InvalidConfig(
                    "category requires dual-channel stop inputs",
                ))
            }
            None => Ok(()),
        }
    }

    /// Category 3+ needs dual-channel wiring on stop-category devices.
    fn config_fault(&self) -> bool {
        self.single_channel_stop_input(self.config.safety_category).is_some()
    }

    /// Aggregate every condition and react to newly raised ones.
    fn evaluate_faults(&mut self) -> FaultReport {
        let now = self.now();
        let inputs: [SafetyInputStatus; SAFETY_INPUT_CHANNELS] =
            core::array::from_fn(|ch| self.inputs[ch].status());
        let outputs: [SafetyOutputStatus; SAFETY_OUTPUT_CHANNELS] =
            core::array::from_fn(|ch| self.outputs[ch].status());
        let supply_ok = self.hal.supply_ok();

        let report = self.aggregator.check(&FaultInputs {
            inputs: &inputs,
            outputs: &outputs,
            watchdog_expired: self.watchdog.expired(now),
            supply_ok,
            config_fault: self.config_fault(),
            internal_fault: self.internal_fault,
        });
        self.internal_fault = false;
        self.status.fault_code = report.code;

        if !report.raised.is_empty() {
            self.react_to_fault(&report);
        }
        report
    }

    /// Fault reaction: count, de-energize, enter `Fault` (or stay in
    /// `Emergency`) and publish one event per newly raised condition.
    fn react_to_fault(&mut self, report: &FaultReport) {
        self.status.fault_count = self
            .status
            .fault_count
            .wrapping_add(report.raised.bits().count_ones());
        if !self.deenergize_all() {
            // Re-raised as Internal by the next aggregation.
            error!("Outputs could not be de-energized during fault reaction");
        }
        let _ = self.transition(Trigger::Fault);
        if self.config.enable_safe_state_enforcement {
            self.status.safe_state_enforced = true;
        }

        for code in FaultCode::PRECEDENCE {
            if !report.raised.contains(code.flag()) {
                continue;
            }
            let event = match code {
                FaultCode::Watchdog => SafetyEvent::WatchdogTimeout,
                FaultCode::CrossMonitor => SafetyEvent::CrossMonitorFail,
                FaultCode::PowerSupply => SafetyEvent::PowerLoss,
                _ => SafetyEvent::FaultDetected,
            };
            error!("Safety fault detected: {code}");
            let channel = self.fault_channel(code);
            self.publish(event, channel, code.description());
        }
    }

    /// First channel carrying a per-channel fault condition.
    fn fault_channel(&self, code: FaultCode) -> Option<u8> {
        match code {
            FaultCode::InputStuck => self.inputs.iter().find(|m| m.status().stuck_at).map(ChannelMonitor::channel),
            FaultCode::CrossMonitor => self
                .inputs
                .iter()
                .find(|m| m.status().cross_monitor_fail)
                .map(ChannelMonitor::channel),
            FaultCode::OutputShort => self
                .outputs
                .iter()
                .find(|o| o.status().short_circuit)
                .map(OutputSupervisor::channel),
            FaultCode::OutputFeedback => self
                .outputs
                .iter()
                .find(|o| o.status().feedback_mismatch)
                .map(OutputSupervisor::channel),
            _ => None,
        }
    }
}

fn input_index(channel: u8) -> Result<usize, SafetyError> {
    let ch = channel as usize;
    if ch < SAFETY_INPUT_CHANNELS {
        Ok(ch)
    } else {
        Err(SafetyError::ChannelOutOfRange {
            channel,
            max: SAFETY_INPUT_CHANNELS,
        })
    }
}

fn output_index(channel: u8) -> Result<usize, SafetyError> {
    let ch = channel as usize;
    if ch < SAFETY_OUTPUT_CHANNELS {
        Ok(ch)
    } else {
        Err(SafetyError::ChannelOutOfRange {
            channel,
            max: SAFETY_OUTPUT_CHANNELS,
        })
    }
}
