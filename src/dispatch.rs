//! Background execution of edits.
//!
//! An `Editor` owns one `Session` inside a worker task and feeds it jobs
//! from a queue, one at a time and in submission order. Each job runs on a
//! blocking thread against a draft copy of the session; the draft replaces
//! the real session only when the job succeeded and was not cancelled, and
//! the committed image is then published as a `Frame`. Observers therefore
//! only ever see complete images, and a failed or cancelled edit leaves no
//! trace.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use image::DynamicImage;
use tokio::runtime::Handle;
use tokio::sync::oneshot::error::TryRecvError;
use tokio::sync::{mpsc, oneshot, watch};

use crate::capture::FrameSource;
use crate::error::EditError;
use crate::input::{Edit, Region};
use crate::session::Session;

/// A committed image together with the session generation that produced it.
#[derive(Debug, Clone)]
pub struct Frame {
    pub generation: u64,
    pub image: Arc<DynamicImage>,
}

type Job = Box<dyn FnOnce(&mut Session) -> Result<(), EditError> + Send>;

struct Request {
    label: &'static str,
    job: Job,
    cancelled: Arc<AtomicBool>,
    reply: oneshot::Sender<Result<Frame, EditError>>,
}

pub struct Editor {
    requests: mpsc::UnboundedSender<Request>,
    frames: watch::Receiver<Option<Frame>>,
}

impl Editor {
    /// Starts the worker on `runtime`. It stops once the editor is dropped
    /// and the queued jobs are done.
    pub fn new(runtime: &Handle) -> Self {
        let (requests, queue) = mpsc::unbounded_channel();
        let (publisher, frames) = watch::channel(None);
        runtime.spawn(run_worker(queue, publisher));
        Self { requests, frames }
    }

    /// Receiver that is notified after every committed edit.
    pub fn frames(&self) -> watch::Receiver<Option<Frame>> {
        self.frames.clone()
    }

    pub fn latest(&self) -> Option<Frame> {
        self.frames.borrow().clone()
    }

    pub fn load(&self, path: impl Into<PathBuf>) -> TaskHandle {
        let path = path.into();
        self.submit("load", move |session| session.load(&path))
    }

    pub fn capture<S>(&self, mut source: S) -> TaskHandle
    where
        S: FrameSource + Send + 'static,
    {
        self.submit("capture", move |session| session.capture(&mut source))
    }

    pub fn apply(&self, edit: Edit) -> TaskHandle {
        self.submit(edit.label(), move |session| session.apply(&edit))
    }

    pub fn extract_channel(&self, name: impl Into<String>) -> TaskHandle {
        self.apply(Edit::Channel(name.into()))
    }

    pub fn crop(&self, region: Region) -> TaskHandle {
        self.apply(Edit::Crop(region))
    }

    pub fn rotate(&self, degrees: f64) -> TaskHandle {
        self.apply(Edit::Rotate(degrees))
    }

    pub fn draw_rectangle(&self, region: Region) -> TaskHandle {
        self.apply(Edit::Rectangle(region))
    }

    pub fn reset(&self) -> TaskHandle {
        self.apply(Edit::Reset)
    }

    fn submit<F>(&self, label: &'static str, job: F) -> TaskHandle
    where
        F: FnOnce(&mut Session) -> Result<(), EditError> + Send + 'static,
    {
        let (reply, result) = oneshot::channel();
        let cancelled = Arc::new(AtomicBool::new(false));
        let request = Request {
            label,
            job: Box::new(job),
            cancelled: Arc::clone(&cancelled),
            reply,
        };

        if let Err(mpsc::error::SendError(request)) = self.requests.send(request) {
            let _ = request
                .reply
                .send(Err(EditError::Worker("editor worker is not running".to_string())));
        }

        TaskHandle {
            label,
            result,
            cancelled,
        }
    }
}

/// Handle to one submitted edit. Dropping it does not cancel the edit.
pub struct TaskHandle {
    label: &'static str,
    result: oneshot::Receiver<Result<Frame, EditError>>,
    cancelled: Arc<AtomicBool>,
}

impl TaskHandle {
    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Asks the worker to drop this edit. An edit that has not been committed
    /// yet resolves to `EditError::Cancelled` and leaves the session alone;
    /// one that already committed is unaffected.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub async fn wait(self) -> Result<Frame, EditError> {
        self.result.await.unwrap_or_else(|_| Err(worker_gone()))
    }

    /// Non-blocking poll. Returns `Some` exactly once, when the edit is done.
    pub fn try_result(&mut self) -> Option<Result<Frame, EditError>> {
        match self.result.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Closed) => Some(Err(worker_gone())),
        }
    }
}

fn worker_gone() -> EditError {
    EditError::Worker("editor worker stopped before finishing the edit".to_string())
}

async fn run_worker(
    mut queue: mpsc::UnboundedReceiver<Request>,
    publisher: watch::Sender<Option<Frame>>,
) {
    let mut session = Session::new();

    while let Some(request) = queue.recv().await {
        let label = request.label;
        let outcome = run_request(&mut session, request.job, &request.cancelled).await;

        match &outcome {
            Ok(frame) => {
                log::info!("Applied {} (generation {})", label, frame.generation);
                publisher.send_replace(Some(frame.clone()));
            }
            Err(EditError::Cancelled) => log::info!("Cancelled {}", label),
            Err(err) => log::warn!("{} failed: {}", label, err),
        }

        // The submitter may have dropped its handle; that is fine.
        let _ = request.reply.send(outcome);
    }

    log::debug!("Editor worker stopped");
}

async fn run_request(
    session: &mut Session,
    job: Job,
    cancelled: &AtomicBool,
) -> Result<Frame, EditError> {
    if cancelled.load(Ordering::SeqCst) {
        return Err(EditError::Cancelled);
    }

    let mut draft = session.clone();
    let (draft, result) = tokio::task::spawn_blocking(move || {
        let result = job(&mut draft);
        (draft, result)
    })
    .await
    .map_err(|err| EditError::Worker(err.to_string()))?;
    result?;

    if cancelled.load(Ordering::SeqCst) {
        return Err(EditError::Cancelled);
    }

    let image = draft.current().cloned().ok_or(EditError::NoImage)?;
    *session = draft;
    Ok(Frame {
        generation: session.generation(),
        image,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgb, RgbImage};
    use std::sync::mpsc as std_mpsc;

    fn gradient(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            Rgb([x as u8, y as u8, 128])
        }))
    }

    fn still(img: DynamicImage) -> impl FnMut() -> Result<DynamicImage, EditError> + Send + 'static {
        move || Ok(img.clone())
    }

    /// A source that blocks until the returned sender fires.
    fn gated(
        img: DynamicImage,
    ) -> (
        std_mpsc::Sender<()>,
        impl FnMut() -> Result<DynamicImage, EditError> + Send + 'static,
    ) {
        let (open, gate) = std_mpsc::channel::<()>();
        let source = move || {
            let _ = gate.recv();
            Ok(img.clone())
        };
        (open, source)
    }

    #[tokio::test]
    async fn test_edits_apply_in_submission_order() {
        let editor = Editor::new(&Handle::current());

        let capture = editor.capture(still(gradient(100, 100)));
        let handles = vec![
            editor.crop(Region::new(10, 10, 50, 50)),
            editor.rotate(90.0),
            editor.draw_rectangle(Region::new(0, 0, 20, 10)),
            editor.extract_channel("Blue"),
        ];

        let first = capture.wait().await.unwrap();
        assert_eq!(first.image.dimensions(), (100, 100));

        let mut generations = vec![first.generation];
        for handle in handles {
            let frame = handle.wait().await.unwrap();
            assert_eq!(frame.image.dimensions(), (50, 50));
            generations.push(frame.generation);
        }
        assert_eq!(generations, vec![1, 2, 3, 4, 5]);

        let latest = editor.latest().unwrap();
        assert_eq!(latest.generation, 5);
        assert!(latest.image.as_luma8().is_some());
    }

    #[tokio::test]
    async fn test_edit_without_image_reports_error() {
        let editor = Editor::new(&Handle::current());

        assert!(matches!(editor.rotate(10.0).wait().await, Err(EditError::NoImage)));
        assert!(matches!(editor.reset().wait().await, Err(EditError::NoSnapshot)));
        assert!(editor.latest().is_none());
    }

    #[tokio::test]
    async fn test_failed_edit_publishes_nothing() {
        let editor = Editor::new(&Handle::current());
        editor.capture(still(gradient(100, 100))).wait().await.unwrap();

        let err = editor.crop(Region::new(10, 10, 200, 50)).wait().await.unwrap_err();
        assert!(matches!(err, EditError::CropOutOfBounds { .. }));
        let err = editor.extract_channel("purple").wait().await.unwrap_err();
        assert!(matches!(err, EditError::UnknownChannel(_)));

        let latest = editor.latest().unwrap();
        assert_eq!(latest.generation, 1);
        assert_eq!(latest.image.dimensions(), (100, 100));
    }

    #[tokio::test]
    async fn test_cancelled_queued_edit_never_runs() {
        let editor = Editor::new(&Handle::current());
        let (open, source) = gated(gradient(100, 100));

        let capture = editor.capture(source);
        let crop = editor.crop(Region::new(0, 0, 10, 10));
        crop.cancel();
        open.send(()).unwrap();

        assert_eq!(capture.wait().await.unwrap().generation, 1);
        assert!(matches!(crop.wait().await, Err(EditError::Cancelled)));
        assert_eq!(editor.latest().unwrap().image.dimensions(), (100, 100));
    }

    #[tokio::test]
    async fn test_cancel_while_running_skips_commit() {
        let editor = Editor::new(&Handle::current());
        let (open, source) = gated(gradient(30, 30));

        let capture = editor.capture(source);
        capture.cancel();
        assert!(capture.is_cancelled());
        // The job may be dropped before it ever waits on the gate.
        let _ = open.send(());

        assert!(matches!(capture.wait().await, Err(EditError::Cancelled)));
        assert!(editor.latest().is_none());
        assert!(matches!(editor.reset().wait().await, Err(EditError::NoSnapshot)));
    }

    #[tokio::test]
    async fn test_panicking_edit_keeps_worker_alive() {
        let editor = Editor::new(&Handle::current());
        editor.capture(still(gradient(20, 20))).wait().await.unwrap();

        let boom = editor.capture(|| -> Result<DynamicImage, EditError> { panic!("camera exploded") });
        assert!(matches!(boom.wait().await, Err(EditError::Worker(_))));

        let frame = editor.rotate(0.0).wait().await.unwrap();
        assert_eq!(frame.generation, 2);
    }

    #[tokio::test]
    async fn test_frames_receiver_sees_commits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.png");
        gradient(40, 30).save(&path).unwrap();

        let editor = Editor::new(&Handle::current());
        let mut frames = editor.frames();
        assert!(frames.borrow().is_none());

        let handle = editor.load(&path);
        frames.changed().await.unwrap();
        let frame = frames.borrow_and_update().clone().unwrap();
        assert_eq!(frame.generation, 1);
        assert_eq!(frame.image.dimensions(), (40, 30));
        assert_eq!(handle.wait().await.unwrap().generation, 1);
    }

    #[tokio::test]
    async fn test_try_result_polls_once() {
        let editor = Editor::new(&Handle::current());
        let (open, source) = gated(gradient(8, 8));

        let mut handle = editor.capture(source);
        assert_eq!(handle.label(), "capture");
        assert!(handle.try_result().is_none());

        open.send(()).unwrap();
        let outcome = loop {
            if let Some(outcome) = handle.try_result() {
                break outcome;
            }
            tokio::task::yield_now().await;
        };
        assert_eq!(outcome.unwrap().generation, 1);
    }
}
