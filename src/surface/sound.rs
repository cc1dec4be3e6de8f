//! Sound playback on a dedicated thread backed by raylib.
//!
//! raylib streams borrow the audio device, so the device and the one playing
//! stream live on their own thread. The window surface talks to it through a
//! [`SoundBridge`]: commands go over a channel and the thread is joined when
//! the bridge is dropped.
//!
//! Only one sound plays at a time. Starting a sound stops the previous one,
//! and a looped sound restarts from the beginning whenever it ends.

use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, unbounded};
use log::{error, info, warn};
use raylib::core::audio::{Music, RaylibAudio};

const PUMP_INTERVAL: Duration = Duration::from_millis(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SoundCmd {
    Play { path: String, looped: bool },
    Reset,
    Shutdown,
}

pub struct SoundBridge {
    tx_cmd: Sender<SoundCmd>,
    handle: Option<JoinHandle<()>>,
}

impl SoundBridge {
    pub fn spawn() -> Self {
        let (tx_cmd, rx_cmd) = unbounded::<SoundCmd>();
        let handle = thread::spawn(move || sound_thread(rx_cmd));
        Self {
            tx_cmd,
            handle: Some(handle),
        }
    }

    pub fn send(&self, cmd: SoundCmd) {
        if self.tx_cmd.send(cmd).is_err() {
            warn!("Sound thread is not running");
        }
    }
}

impl Drop for SoundBridge {
    fn drop(&mut self) {
        let _ = self.tx_cmd.send(SoundCmd::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn stop(current: &mut Option<(Music<'_>, bool)>) {
    if let Some((music, _)) = current.take() {
        music.stop_stream();
    }
}

fn sound_thread(rx_cmd: Receiver<SoundCmd>) {
    let audio = match RaylibAudio::init_audio_device() {
        Ok(device) => device,
        Err(e) => {
            error!("Failed to initialize audio device: {}", e);
            return;
        }
    };
    let mut current: Option<(Music<'_>, bool)> = None;

    loop {
        for cmd in rx_cmd.try_iter() {
            match cmd {
                SoundCmd::Play { path, looped } => {
                    stop(&mut current);
                    match audio.new_music(&path) {
                        Ok(music) => {
                            info!("Playing sound '{}' (looped={})", path, looped);
                            music.play_stream();
                            current = Some((music, looped));
                        }
                        Err(e) => error!("Failed to play sound '{}': {}", path, e),
                    }
                }
                SoundCmd::Reset => stop(&mut current),
                SoundCmd::Shutdown => {
                    stop(&mut current);
                    return;
                }
            }
        }

        // Streams must be pumped while they play.
        let mut finished = false;
        if let Some((music, looped)) = &current {
            music.update_stream();
            if !music.is_stream_playing() {
                if *looped {
                    music.seek_stream(0.0);
                    music.play_stream();
                } else {
                    finished = true;
                }
            }
        }
        if finished {
            current = None;
        }

        thread::sleep(PUMP_INTERVAL);
    }
}
