//! Window lifecycle: turns SDL events into engine creation, teardown and frames.
//!
//! On mobile the window can disappear while the process keeps running, so the
//! engine lives in an `Option` and is rebuilt when the window comes back.

use std::time::Duration;

use anyhow::{anyhow, Result};
use ash::vk;
use sdl2::event::{Event, WindowEvent};
use sdl2::keyboard::Keycode;
use sdl2::video::Window;

use crate::config::Config;
use crate::vk_engine::VulkanEngine;

const IDLE_SLEEP: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppCommand {
    Quit,
    /// The window is being shown, get it ready.
    InitWindow,
    /// The window is being hidden or closed, clean it up.
    TermWindow,
    Pause,
    Resume,
    Resized,
    ToggleScene,
}

pub fn translate_event(event: &Event) -> Option<AppCommand> {
    match event {
        Event::Quit { .. }
        | Event::AppTerminating { .. }
        | Event::KeyDown {
            keycode: Some(Keycode::Escape),
            ..
        } => Some(AppCommand::Quit),
        Event::AppDidEnterForeground { .. } => Some(AppCommand::InitWindow),
        Event::AppWillEnterBackground { .. } => Some(AppCommand::TermWindow),
        Event::KeyDown {
            keycode: Some(Keycode::Space),
            repeat: false,
            ..
        } => Some(AppCommand::ToggleScene),
        Event::Window { win_event, .. } => match win_event {
            WindowEvent::Minimized => Some(AppCommand::Pause),
            WindowEvent::Restored => Some(AppCommand::Resume),
            WindowEvent::SizeChanged(..) => Some(AppCommand::Resized),
            _ => None,
        },
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Initialize,
    Terminate,
    None,
}

#[derive(Debug, Default)]
pub struct Lifecycle {
    initialized: bool,
    paused: bool,
    quit: bool,
}

impl Lifecycle {
    pub fn handle(&mut self, command: AppCommand) -> Transition {
        match command {
            AppCommand::InitWindow if !self.initialized && !self.quit => {
                self.initialized = true;
                self.paused = false;
                Transition::Initialize
            }
            AppCommand::TermWindow if self.initialized => {
                self.initialized = false;
                Transition::Terminate
            }
            AppCommand::Quit => {
                self.quit = true;
                if self.initialized {
                    self.initialized = false;
                    Transition::Terminate
                } else {
                    Transition::None
                }
            }
            AppCommand::Pause => {
                self.paused = true;
                Transition::None
            }
            AppCommand::Resume => {
                self.paused = false;
                Transition::None
            }
            _ => Transition::None,
        }
    }

    pub fn should_render(&self) -> bool {
        self.initialized && !self.paused && !self.quit
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }
}

fn drawable_extent(window: &Window) -> vk::Extent2D {
    let (width, height) = window.vulkan_drawable_size();
    vk::Extent2D { width, height }
}

pub fn run(config: &Config) -> Result<()> {
    //SDL initialization
    let sdl_context = sdl2::init().map_err(|e| anyhow!("Failed to initialize SDL: {e}"))?;
    let video_subsystem = sdl_context
        .video()
        .map_err(|e| anyhow!("Failed to initialize SDL video: {e}"))?;
    let window = video_subsystem
        .window(&config.window.title, config.window.width, config.window.height)
        .position_centered()
        .vulkan()
        .resizable()
        .build()?;
    let mut event_pump = sdl_context
        .event_pump()
        .map_err(|e| anyhow!("Failed to get SDL event pump: {e}"))?;

    let mut lifecycle = Lifecycle::default();
    let mut engine: Option<VulkanEngine> = None;

    //the window already exists, desktop platforms never send a foreground event for it
    let mut pending = vec![AppCommand::InitWindow];
    loop {
        pending.extend(event_pump.poll_iter().filter_map(|event| translate_event(&event)));

        for command in pending.drain(..) {
            match lifecycle.handle(command) {
                Transition::Initialize => {
                    log::info!("Window ready, initializing engine");
                    engine = Some(VulkanEngine::init(&window, config)?);
                }
                Transition::Terminate => {
                    log::info!("Window going away, tearing down engine");
                    engine = None;
                }
                Transition::None => {}
            }
            if let Some(engine) = engine.as_mut() {
                match command {
                    AppCommand::Resized | AppCommand::Resume => engine.resize(drawable_extent(&window)),
                    AppCommand::ToggleScene => engine.toggle_scene(),
                    _ => {}
                }
            }
        }

        if lifecycle.should_quit() {
            break;
        }

        match engine.as_mut() {
            Some(engine) if lifecycle.should_render() => engine.draw()?,
            //do not draw if we are minimized or have no window
            _ => std::thread::sleep(IDLE_SLEEP),
        }
    }
    //no cleanup, it's in the engine's drop
    Ok(())
}
