use std::thread;
use std::sync::mpsc;
use std::sync::{ Arc, Mutex };
use std::sync::atomic::{ AtomicBool, Ordering };

use log::{ debug, error, info };

use crate::scene::Scene;
use crate::camera::Camera;
use crate::canvas::Canvas;
use crate::color::Color;
use crate::tracer::Tracer;
use crate::config::{ within_pixel_budget, RenderConfig };
use crate::error::{ ConfigError, TraceError };

pub enum Message {
    Row(usize),
    Terminate,
}

/// A finished scanline. `pixels` is `None` when the row was skipped because
/// the render was cancelled.
struct RowResult {
    y: usize,
    pixels: Option<Vec<Color>>,
}

/// Hooks the caller passes into a render.
///
/// Progress is reported on the calling thread after each row lands, as
/// `(rows_done, rows_total)`. The cancel flag is checked between rows.
#[derive(Default)]
pub struct RenderContext {
    progress: Option<Box<dyn Fn(usize, usize)>>,
    cancel: Option<Arc<AtomicBool>>,
}

impl RenderContext {
    pub fn new() -> RenderContext {
        Default::default()
    }

    pub fn on_progress<F: Fn(usize, usize) + 'static>(mut self, f: F) -> RenderContext {
        self.progress = Some(Box::new(f));
        self
    }

    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> RenderContext {
        self.cancel = Some(flag);
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().map_or(false, |c| c.load(Ordering::Relaxed))
    }

    fn report(&self, done: usize, total: usize) {
        if let Some(f) = &self.progress {
            f(done, total);
        }
    }
}

/// Per-render settings every worker needs.
#[derive(Clone)]
struct Job {
    scene: Arc<Scene>,
    camera: Arc<Camera>,
    max_depth: usize,
    epsilon: f64,
    cancel: Option<Arc<AtomicBool>>,
}

impl Job {
    fn cancelled(&self) -> bool {
        self.cancel.as_ref().map_or(false, |c| c.load(Ordering::Relaxed))
    }
}

struct Worker {
    thread: Option<thread::JoinHandle<()>>,
}

impl Worker {
    fn new(id: usize, job: Job, receiver: Arc<Mutex<mpsc::Receiver<Message>>>,
        results: mpsc::Sender<RowResult>) -> Worker {

        let thread = thread::spawn(move || {
            let tracer = Tracer::with_limits(&job.scene, job.max_depth, job.epsilon);

            loop {
                // Obtain the message being executed. A poisoned lock or a
                // closed channel both mean the pool is going away.
                let message = match receiver.lock() {
                    Ok(rx) => rx.recv(),
                    Err(_) => break,
                };

                let y = match message {
                    Ok(Message::Row(y)) => y,
                    Ok(Message::Terminate) | Err(_) => break,
                };

                let pixels = if job.cancelled() {
                    None
                } else {
                    Some((0..job.camera.hsize)
                        .map(|x| tracer.primary(&job.camera.ray_for_pixel(x, y),
                            job.camera.background))
                        .collect())
                };

                if results.send(RowResult { y, pixels }).is_err() {
                    break;
                }
            }

            debug!("render worker {} exiting", id);
        });

        Worker { thread: Some(thread) }
    }
}

/// A fixed set of threads pulling rows off a shared queue.
pub struct ThreadPool {
    workers: Vec<Worker>,
    sender: mpsc::Sender<Message>,
}

impl ThreadPool {
    fn new(size: usize, job: Job, results: mpsc::Sender<RowResult>) -> ThreadPool {
        // There should be at least one thread to run workers.
        let size = size.max(1);

        let (sender, receiver) = mpsc::channel();
        let receiver = Arc::new(Mutex::new(receiver));

        let workers = (0..size)
            .map(|id| Worker::new(id, job.clone(), Arc::clone(&receiver), results.clone()))
            .collect();

        ThreadPool { workers, sender }
    }

    pub fn execute(&self, message: Message) -> Result<(), TraceError> {
        self.sender.send(message)
            .map_err(|_| TraceError::Worker("every render worker has exited".to_string()))
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        for _ in &self.workers {
            // Workers that already exited have dropped their receiver share;
            // there's nothing to tell them.
            let _ = self.sender.send(Message::Terminate);
        }

        for worker in &mut self.workers {
            if let Some(thread) = worker.thread.take() {
                if thread.join().is_err() {
                    error!("a render worker panicked");
                }
            }
        }
    }
}

/// Renders `scene` on `config.threads` workers, one scanline at a time.
///
/// The scene must already be set up. Produces the same image as
/// `Camera::render` on a single thread.
pub fn render(scene: Arc<Scene>, config: &RenderConfig, ctx: &RenderContext)
    -> Result<Canvas, TraceError> {
    config.validate()?;

    let (width, height) = config.resolution_for(&scene.camera);
    if width == 0 || height == 0 || !within_pixel_budget(width, height) {
        return Err(ConfigError::Invalid(
            format!("cannot render a {}x{} image", width, height)).into());
    }

    let camera = Camera::new(&scene.camera, width, height)?;
    let threads = config.threads.min(height);

    info!("rendering {}x{} on {} threads (max depth {})",
        width, height, threads, config.max_depth);

    let job = Job {
        scene,
        camera: Arc::new(camera),
        max_depth: config.max_depth,
        epsilon: config.epsilon,
        cancel: ctx.cancel.clone(),
    };

    let (results, finished) = mpsc::channel();
    let pool = ThreadPool::new(threads, job, results);

    for y in 0..height {
        pool.execute(Message::Row(y))?;
    }

    let mut canvas = Canvas::new(width, height);

    for done in 1..=height {
        let row = finished.recv()
            .map_err(|_| TraceError::Worker("render workers exited early".to_string()))?;

        if ctx.is_cancelled() {
            info!("render cancelled after {} of {} rows", done - 1, height);
            return Err(TraceError::Cancelled);
        }

        match row.pixels {
            Some(pixels) => canvas.write_row(row.y, &pixels),
            None => return Err(TraceError::Cancelled),
        }

        ctx.report(done, height);
    }

    Ok(canvas)
}

#[cfg(test)]
use crate::parser::Parser;
#[cfg(test)]
use std::sync::atomic::AtomicUsize;

#[cfg(test)]
fn spheres() -> Arc<Scene> {
    let mut scene = Parser::parse_str("
        material { name = shiny  ka = (0.1, 0, 0)  kd = (0.6, 0.2, 0.2)  ks = (0.3, 0.3, 0.3)  shiny = 30 }
        light { position = (-3, 4, 6) }
        camera { eye = (0, 1, 6)  center = (0, 0, 0)  background = (0, 0, 0.2)  resolution = (24, 16) }

        push { }
            translate { (-1, 0, 0) }
            sphere { material = shiny }
        pop { }
        translate { (1.2, 0, -1) }
        rotate { 30 (1, 0, 0) }
        cylinder { }
    ", ".").unwrap();

    scene.setup();
    Arc::new(scene)
}

#[test]
fn pooled_render_matches_serial_render() {
    let scene = spheres();
    let config = RenderConfig { threads: 3, ..Default::default() };

    let pooled = render(Arc::clone(&scene), &config, &RenderContext::new()).unwrap();

    let camera = Camera::new(&scene.camera, 24, 16).unwrap();
    let serial = camera.render(&Tracer::with_limits(&scene, config.max_depth, config.epsilon));

    assert_eq!(pooled, serial);
}

#[test]
fn config_resolution_wins_over_camera() {
    let config = RenderConfig { resolution: Some([8, 5]), threads: 2, ..Default::default() };
    let image = render(spheres(), &config, &RenderContext::new()).unwrap();

    assert_eq!((image.width, image.height), (8, 5));
}

#[test]
fn progress_reports_every_row() {
    let calls = Arc::new(AtomicUsize::new(0));
    let last = Arc::new(AtomicUsize::new(0));

    let ctx = {
        let calls = Arc::clone(&calls);
        let last = Arc::clone(&last);
        RenderContext::new().on_progress(move |done, total| {
            assert!(done <= total);
            calls.fetch_add(1, Ordering::SeqCst);
            last.store(done, Ordering::SeqCst);
        })
    };

    render(spheres(), &RenderConfig { threads: 2, ..Default::default() }, &ctx).unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 16);
    assert_eq!(last.load(Ordering::SeqCst), 16);
}

#[test]
fn cancelled_render_stops() {
    let flag = Arc::new(AtomicBool::new(true));
    let ctx = RenderContext::new().with_cancel(Arc::clone(&flag));

    match render(spheres(), &RenderConfig { threads: 2, ..Default::default() }, &ctx) {
        Err(TraceError::Cancelled) => {},
        other => panic!("expected cancellation, got {:?}", other.map(|c| c.width)),
    }
}

#[test]
fn oversized_camera_resolution_is_refused() {
    let mut scene = Parser::parse_str("sphere { }", ".").unwrap();
    scene.camera.resolution = Some((usize::MAX / 2, 3));

    let result = render(Arc::new(scene), &RenderConfig::default(), &RenderContext::new());
    assert!(matches!(result, Err(TraceError::Config(ConfigError::Invalid(_)))));
}
