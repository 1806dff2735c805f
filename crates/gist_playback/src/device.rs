use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use async_trait::async_trait;
use rodio::buffer::SamplesBuffer;
use rodio::{OutputStream, OutputStreamHandle, Sink};
use tokio::sync::watch;
use tracing::debug;

use gist_core::{AudioSink, Error, PlaybackHandle, Result, SpeechClip};

/// Sink backed by the default audio output device.
///
/// The underlying output stream is not `Send` and must stay alive for audio
/// to keep flowing, so a dedicated thread owns it for the life of the
/// process; everything else talks to the device through the stream handle.
pub struct DeviceSink {
    output: OutputStreamHandle,
}

impl DeviceSink {
    pub fn new() -> Result<Self> {
        let (tx, rx) = mpsc::channel();
        thread::Builder::new()
            .name("gist-audio".to_string())
            .spawn(move || match OutputStream::try_default() {
                Ok((stream, handle)) => {
                    if tx.send(Ok(handle)).is_ok() {
                        // Dropping `stream` silences every sink created
                        // from the handle, so park here holding it.
                        let _keepalive = stream;
                        loop {
                            thread::park();
                        }
                    }
                }
                Err(err) => {
                    let _ = tx.send(Err(Error::Audio(format!(
                        "no audio output device: {}",
                        err
                    ))));
                }
            })
            .map_err(|err| Error::Audio(format!("audio thread failed to start: {}", err)))?;
        let output = rx
            .recv()
            .map_err(|_| Error::Audio("audio thread exited during setup".to_string()))??;
        Ok(Self { output })
    }
}

struct DeviceHandle {
    sink: Arc<Sink>,
    rx: watch::Receiver<bool>,
}

#[async_trait]
impl PlaybackHandle for DeviceHandle {
    fn stop(&self) {
        self.sink.stop();
    }

    async fn finished(&self) {
        let mut rx = self.rx.clone();
        while !*rx.borrow_and_update() {
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

impl AudioSink for DeviceSink {
    fn start(&self, clip: SpeechClip) -> Result<Arc<dyn PlaybackHandle>> {
        if clip.sample_rate == 0 || clip.channels == 0 {
            return Err(Error::Audio("clip has no sample format".to_string()));
        }
        let sink = Sink::try_new(&self.output)
            .map_err(|err| Error::Audio(format!("could not open playback sink: {}", err)))?;
        debug!(
            frames = clip.samples.len(),
            rate = clip.sample_rate,
            "starting device playback"
        );
        sink.append(SamplesBuffer::new(
            clip.channels,
            clip.sample_rate,
            clip.samples,
        ));
        let sink = Arc::new(sink);
        let (tx, rx) = watch::channel(false);
        let waiter = Arc::clone(&sink);
        // sleep_until_end returns early when stop() clears the queue
        tokio::task::spawn_blocking(move || {
            waiter.sleep_until_end();
            let _ = tx.send(true);
        });
        Ok(Arc::new(DeviceHandle { sink, rx }))
    }
}
