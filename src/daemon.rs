use anyhow::{Context, Result};
use log::{debug, info, warn};
use rppal::gpio::IoPin;
use snes_ctrl::command::CommandExecutor;
use snes_ctrl::config::Config;
use snes_ctrl::platform::rpi::{BankRegister, RppalPorts};
use snes_ctrl::sim::{SimBus, SimPad, SimRegister};
use snes_ctrl::timing::SpinDelay;
use snes_ctrl::{BitRegister, Button, ButtonState, RegisterMap, SnesController};
use embedded_hal::delay::DelayNs;
use std::time::Duration;
use tokio::time::sleep;

pub struct Daemon<R, D> {
    controller: SnesController<R>,
    delay: D,
    config: Config,
    previous: ButtonState,
}

/// Daemon reading a pad wired to Raspberry Pi GPIO lines.
pub fn open_gpio(config: Config) -> Result<Daemon<BankRegister<IoPin>, SpinDelay>> {
    let ports = RppalPorts::open(config.gpio.ports.clone())
        .context("Failed to acquire GPIO lines")?;
    Daemon::new(config, &ports, SpinDelay::new())
}

/// Daemon reading a simulated pad with nothing pressed. Checks the
/// configuration and bindings without touching hardware.
pub fn open_dry_run(config: Config) -> Result<(SimBus, Daemon<SimRegister, SpinDelay>)> {
    let bus = SimBus::new();
    bus.set_tracing(false);
    bus.attach(config.controller.port, config.controller.pins(), SimPad::new())
        .context("Failed to set up controller")?;
    let daemon = Daemon::new(config, &bus, SpinDelay::new())?;
    Ok((bus, daemon))
}

impl<R: BitRegister, D: DelayNs> Daemon<R, D> {
    pub fn new<M>(config: Config, map: &M, mut delay: D) -> Result<Self>
    where
        M: RegisterMap<Register = R>,
    {
        let controller = SnesController::setup(
            map,
            config.controller.port,
            config.controller.pins(),
            &mut delay,
        )
        .context("Failed to set up controller")?;

        info!(
            "Controller ready on port {} (data {}, clock {}, latch {})",
            config.controller.port,
            config.controller.data_pin,
            config.controller.clock_pin,
            config.controller.latch_pin
        );
        info!("Polling interval: {}ms", config.polling.interval_ms);
        log_bindings(&config);

        Ok(Daemon {
            controller,
            delay,
            config,
            previous: ButtonState::default(),
        })
    }

    pub async fn poll(&mut self) -> Result<()> {
        self.step();
        sleep(Duration::from_millis(self.config.polling.interval_ms)).await;
        Ok(())
    }

    /// Read the pad once and dispatch any new presses.
    pub fn step(&mut self) -> Vec<Button> {
        let state = self.controller.read(&mut self.delay);
        self.on_state(state)
    }

    /// Run the binding of every button pressed since the previous state.
    /// Returns the buttons whose command was run.
    pub fn on_state(&mut self, state: ButtonState) -> Vec<Button> {
        let mut fired = Vec::new();
        for (button, pressed) in state.changes_from(&self.previous) {
            if !pressed {
                debug!("{} released", button);
                continue;
            }
            match self.config.binding(button) {
                Some(mapping) => {
                    if let Err(e) = CommandExecutor::run_binding(mapping) {
                        warn!("{:#}", e);
                    }
                    fired.push(button);
                }
                None => debug!("{} pressed (unbound)", button),
            }
        }
        self.previous = state;
        fired
    }

    /// Swap in new bindings and polling settings. Wiring changes need a restart.
    pub fn reload_config(&mut self, new_config: Config) -> Result<()> {
        if new_config.controller != self.config.controller || new_config.gpio != self.config.gpio {
            warn!("Controller wiring changes are ignored until restart");
        }
        let Config {
            polling, buttons, ..
        } = new_config;
        self.config.polling = polling;
        self.config.buttons = buttons;
        log_bindings(&self.config);
        Ok(())
    }
}

fn log_bindings(config: &Config) {
    info!("{} button binding(s)", config.buttons.len());
    for mapping in &config.buttons {
        info!(
            "  - {}: {}",
            mapping.button,
            mapping.description.as_deref().unwrap_or(&mapping.command)
        );
    }
}
