use clap::{Parser, ValueEnum};
use core::cell::RefCell;
use embassy_time::Instant;
use serde::Deserialize;
use std::convert::Infallible;
use std::io::BufRead;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::Duration;
use terra_core::utils::connection::wire::{FRAME_LEN, WireFrame};
use terra_core::utils::controllers::{Button, ButtonConfig, COMMAND_CHANNEL, Motor, SystemCommand};
use terra_core::utils::electronics::port_map::{
    self, BoardRevision, DIO_1, DIO_2, DIO_3, DIO_4, MOTOR_A, MOTOR_B, PortPins,
};
use terra_core::utils::electronics::registry::ActiveRegistry;
use terra_core::utils::electronics::{
    DeviceKind, DriverError, Electronics, PortId, RoboCoreLink, Service, run_cycle,
};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(version = "1.0")]
struct Opts {
    /// RoboCore board revision, selects the motor pin map
    #[clap(long, value_enum, default_value = "v1-3")]
    board: Board,
    /// button debounce interval in milliseconds
    #[clap(long, default_value_t = 50)]
    debounce_ms: u64,
    /// buttons read low when pressed
    #[clap(long)]
    active_low: bool,
    /// kernel scheduling period in milliseconds
    #[clap(long, default_value_t = 10)]
    cycle_ms: u64,
    /// stop after this many cycles (0 runs until stdin closes)
    #[clap(long, default_value_t = 0)]
    cycles: u64,
}

#[derive(Clone, Copy, ValueEnum)]
enum Board {
    #[value(name = "v1-1")]
    V1_1,
    #[value(name = "v1-3")]
    V1_3,
}

impl From<Board> for BoardRevision {
    fn from(board: Board) -> Self {
        match board {
            Board::V1_1 => BoardRevision::V1_1,
            Board::V1_3 => BoardRevision::V1_3,
        }
    }
}

/// Simulation-only input, e.g. `{"sim":"level","p":1,"high":true}`.
#[derive(Debug, Deserialize)]
#[serde(tag = "sim", rename_all = "snake_case")]
enum SimCommand {
    /// Drive the raw level of the button on DIO port `p`.
    Level { p: u8, high: bool },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Line {
    Sim(SimCommand),
    System(SystemCommand),
}

/// Serial port that decodes and logs every frame written to it.
#[derive(Default)]
struct SerialMonitor {
    pending: Vec<u8>,
}

impl embedded_io::ErrorType for SerialMonitor {
    type Error = Infallible;
}

impl embedded_io::Write for SerialMonitor {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.pending.extend_from_slice(buf);
        while self.pending.len() >= FRAME_LEN {
            let bytes: Vec<u8> = self.pending.drain(..FRAME_LEN).collect();
            match WireFrame::decode(&bytes) {
                Ok(frame) => info!("wire {:02X?} {:?}", bytes, frame),
                Err(e) => warn!("wire {:02X?} undecodable: {}", bytes, e),
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// PWM output with a 0..=255 duty range that logs every write.
struct SimPwm {
    pin: u8,
}

impl embedded_hal::pwm::ErrorType for SimPwm {
    type Error = Infallible;
}

impl embedded_hal::pwm::SetDutyCycle for SimPwm {
    fn max_duty_cycle(&self) -> u16 {
        255
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
        debug!("pin {} pwm duty {}", self.pin, duty);
        Ok(())
    }
}

/// Digital output that logs every write.
struct SimPin {
    pin: u8,
}

impl embedded_hal::digital::ErrorType for SimPin {
    type Error = Infallible;
}

impl embedded_hal::digital::OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        debug!("pin {} low", self.pin);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        debug!("pin {} high", self.pin);
        Ok(())
    }
}

/// Button input whose level is driven from stdin.
struct SimButton {
    level: Arc<AtomicBool>,
}

impl embedded_hal::digital::ErrorType for SimButton {
    type Error = Infallible;
}

impl embedded_hal::digital::InputPin for SimButton {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.level.load(Ordering::Relaxed))
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.level.load(Ordering::Relaxed))
    }
}

type SimMotor<'a> = Motor<'a, SerialMonitor, SimPwm, SimPin>;
type SimButtonDriver<'a> = Button<'a, SerialMonitor, SimButton>;

const BUTTON_PORTS: [PortId; 4] = [DIO_1, DIO_2, DIO_3, DIO_4];

fn attach_motor<'a>(
    link: RoboCoreLink<'a, SerialMonitor>,
    port: PortId,
    revision: BoardRevision,
) -> Result<SimMotor<'a>, DriverError> {
    let PortPins::Motor { pwm, dir } = port_map::pins(DeviceKind::Motor, port, revision)? else {
        return Err(DriverError::InvalidPort(port.0));
    };
    info!("motor port {} on pwm pin {} dir pin {}", port.0, pwm, dir);
    Motor::attach(link, port, SimPwm { pin: pwm }, SimPin { pin: dir })
}

/// Reads host commands from stdin until it closes.
fn spawn_reader(levels: Vec<Arc<AtomicBool>>, closed: Arc<AtomicBool>) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Line>(&line) {
                Ok(Line::Sim(SimCommand::Level { p, high })) => {
                    match levels.get(usize::from(p).wrapping_sub(1)) {
                        Some(level) => level.store(high, Ordering::Relaxed),
                        None => warn!("no simulated button on port {}", p),
                    }
                }
                Ok(Line::System(cmd)) => {
                    if COMMAND_CHANNEL.try_send(cmd).is_err() {
                        warn!("command channel full, dropping {:?}", cmd);
                    }
                }
                Err(error) => warn!(?error, "invalid command line"),
            }
        }
        closed.store(true, Ordering::Relaxed);
    });
}

fn dispatch(cmd: SystemCommand, motors: &mut [SimMotor<'_>], buttons: &mut [SimButtonDriver<'_>]) {
    info!("Received command: {:?}", cmd);
    let result = match cmd {
        SystemCommand::M { p, c } => match motors.iter_mut().find(|m| m.port() == p) {
            Some(motor) => motor.execute(c),
            None => Err(DriverError::InvalidPort(p.0)),
        },
        SystemCommand::B { p, c } => match buttons.iter_mut().find(|b| b.port() == p) {
            Some(button) => button.execute(c),
            None => Err(DriverError::InvalidPort(p.0)),
        },
    };
    if let Err(e) = result {
        warn!("command {:?} failed: {}", cmd, e);
    }
}

fn main() -> Result<(), DriverError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    let opts: Opts = Opts::parse();
    let revision = BoardRevision::from(opts.board);
    let config = ButtonConfig {
        debounce: embassy_time::Duration::from_millis(opts.debounce_ms),
        active_low: opts.active_low,
    };

    let serial = RefCell::new(SerialMonitor::default());
    let registry = ActiveRegistry::new();
    let link = RoboCoreLink::new(&serial, &registry);

    let mut motors = vec![
        attach_motor(link, MOTOR_A, revision)?,
        attach_motor(link, MOTOR_B, revision)?,
    ];

    let levels: Vec<Arc<AtomicBool>> = BUTTON_PORTS
        .iter()
        .map(|_| Arc::new(AtomicBool::new(opts.active_low)))
        .collect();
    let mut buttons = BUTTON_PORTS
        .iter()
        .zip(&levels)
        .map(|(&port, level)| {
            let pin = SimButton {
                level: Arc::clone(level),
            };
            Button::attach(link, port, pin, config)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let closed = Arc::new(AtomicBool::new(false));
    spawn_reader(levels, Arc::clone(&closed));

    info!("RoboCore simulation running, {} ms cycle", opts.cycle_ms);
    let mut cycle = 0u64;
    let mut closed_at: Option<Instant> = None;
    loop {
        while let Ok(cmd) = COMMAND_CHANNEL.try_receive() {
            dispatch(cmd, &mut motors, &mut buttons);
        }

        let now = Instant::now();
        {
            let mut services: Vec<&mut dyn Service> = Vec::new();
            for motor in motors.iter_mut() {
                services.push(motor);
            }
            for button in buttons.iter_mut() {
                services.push(button);
            }
            run_cycle(&mut services, now);
        }

        let queues = motors
            .iter_mut()
            .map(|m| m.events_mut())
            .chain(buttons.iter_mut().map(|b| b.events_mut()));
        for queue in queues {
            for event in queue.drain() {
                match serde_json::to_string(&event) {
                    Ok(json) => info!("event {}", json),
                    Err(error) => warn!(?error, "failed to serialize event"),
                }
            }
        }

        cycle += 1;
        if opts.cycles != 0 && cycle >= opts.cycles {
            break;
        }
        if closed.load(Ordering::Relaxed) && COMMAND_CHANNEL.is_empty() {
            // let pending debounces settle before exiting
            let since = *closed_at.get_or_insert(now);
            if now - since > config.debounce * 2 {
                break;
            }
        }
        std::thread::sleep(Duration::from_millis(opts.cycle_ms));
    }

    info!(
        "shutting down after {} cycles, {} motors and {} buttons active",
        cycle,
        registry.count(DeviceKind::Motor),
        registry.count(DeviceKind::Button)
    );
    Ok(())
}
