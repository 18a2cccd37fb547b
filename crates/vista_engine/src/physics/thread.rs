//! Fixed-rate simulation thread

use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam::channel::{bounded, unbounded, Receiver, Sender, TryRecvError, TrySendError};

use crate::core::config::PhysicsConfig;
use crate::physics::world::{PhysicsWorld, RigidBody};
use crate::physics::{BodyHandle, PhysicsCommand, PhysicsError, PhysicsSnapshot};

/// Handle to the background simulation
///
/// Dropping the handle stops and joins the thread.
pub struct PhysicsThread {
    commands: Sender<PhysicsCommand>,
    snapshots: Receiver<PhysicsSnapshot>,
    handle: Option<JoinHandle<()>>,
    next_body: u64,
}

impl PhysicsThread {
    /// Start the simulation on a thread named `physics`
    ///
    /// Fails with [`PhysicsError::InvalidTickRate`] for a zero tick rate.
    pub fn spawn(config: &PhysicsConfig) -> Result<Self, PhysicsError> {
        if config.tick_rate_hz == 0 {
            return Err(PhysicsError::InvalidTickRate);
        }

        let (command_sender, command_receiver) = unbounded();
        // Single slot holding the newest snapshot; the simulation evicts
        // an unread one through its own receiver before publishing.
        let (snapshot_sender, snapshot_receiver) = bounded(1);
        let stale = snapshot_receiver.clone();

        let world = PhysicsWorld::new(config);
        let timestep = config.timestep();

        let handle = thread::Builder::new()
            .name("physics".to_string())
            .spawn(move || run(world, timestep, command_receiver, snapshot_sender, stale))?;

        log::info!("Physics thread started at {} Hz", config.tick_rate_hz);

        Ok(Self {
            commands: command_sender,
            snapshots: snapshot_receiver,
            handle: Some(handle),
            next_body: 0,
        })
    }

    /// Queue a command for the next step
    pub fn send(&self, command: PhysicsCommand) -> Result<(), PhysicsError> {
        self.commands.send(command).map_err(|_| PhysicsError::Disconnected)
    }

    /// Allocate a handle and queue the body
    pub fn add_body(&mut self, body: RigidBody) -> Result<BodyHandle, PhysicsError> {
        let handle = BodyHandle(self.next_body);
        self.next_body += 1;
        self.send(PhysicsCommand::AddBody { handle, body })?;
        Ok(handle)
    }

    /// Newest snapshot published since the last call
    ///
    /// Only the result of the latest step is kept; older ones are replaced
    /// as the simulation publishes.
    pub fn latest_snapshot(&self) -> Option<PhysicsSnapshot> {
        self.snapshots.try_iter().last()
    }

    /// Whether the simulation thread is still alive
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Stop the simulation and wait for the thread to exit
    pub fn shutdown(mut self) -> Result<(), PhysicsError> {
        self.stop()
    }

    fn stop(&mut self) -> Result<(), PhysicsError> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };

        // The thread may already have exited; joining reports how.
        let _ = self.commands.send(PhysicsCommand::Shutdown);
        handle.join().map_err(|_| PhysicsError::ThreadPanicked)?;
        log::info!("Physics thread stopped");
        Ok(())
    }
}

impl Drop for PhysicsThread {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            log::error!("Physics thread shutdown failed: {}", e);
        }
    }
}

fn run(
    mut world: PhysicsWorld,
    timestep: f32,
    commands: Receiver<PhysicsCommand>,
    snapshots: Sender<PhysicsSnapshot>,
    stale: Receiver<PhysicsSnapshot>,
) {
    let tick = Duration::from_secs_f32(timestep);
    let mut next_tick = Instant::now();

    loop {
        loop {
            match commands.try_recv() {
                Ok(command) => {
                    if !world.apply(command) {
                        return;
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => return,
            }
        }

        world.step(timestep);

        let mut snapshot = world.snapshot();
        loop {
            match snapshots.try_send(snapshot) {
                Ok(()) => break,
                Err(TrySendError::Full(unsent)) => {
                    let _ = stale.try_recv();
                    snapshot = unsent;
                }
                Err(TrySendError::Disconnected(_)) => return,
            }
        }

        next_tick += tick;
        let now = Instant::now();
        if next_tick > now {
            thread::sleep(next_tick - now);
        } else {
            // Fell behind; don't try to catch up with a burst of steps
            next_tick = now;
        }
    }
}
