use crate::browser::{self, html};
use anyhow::Result;
use async_trait::async_trait;
use futures::StreamExt;
use std::cell::{Cell, RefCell};
// web assembly is single threaded, so Rc RefCell > Mutex
use std::rc::Rc;
use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use self::input::InputEvent;

#[async_trait(?Send)]
pub trait Game {
    async fn initialize(&self) -> Result<Box<dyn Game>>;
    fn handle_input(&mut self, event: &InputEvent);
    /// one fixed step of FRAME_SIZE
    fn update(&mut self);
    fn draw(&self, renderer: &Renderer);
    /// called once per wall-clock second by the session clock
    fn on_second(&mut self);
    fn restart(&mut self);
    fn is_running(&self) -> bool;
}

// length of a frame in milliseconds
pub const FRAME_SIZE: f64 = 1.0 / 60.0 * 1000.0;
// cap on catch-up updates per display frame (background tabs, restarts)
pub const MAX_SUBSTEPS: u32 = 8;
const SECOND_MS: i32 = 1000;

/// Fixed timestep bookkeeping for the frame callback
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GameLoop {
    last_frame: f64,
    accumulated_delta: f64,
}

type SharedGame = Rc<RefCell<Box<dyn Game>>>;
type SharedLoopClosure = Rc<RefCell<Option<browser::LoopClosure>>>;

impl GameLoop {
    pub fn new(now: f64) -> Self {
        GameLoop {
            last_frame: now,
            accumulated_delta: 0.0,
        }
    }

    /// Forget any time that passed while the loop was not scheduled
    pub fn reset(&mut self, now: f64) {
        *self = GameLoop::new(now);
    }

    /// Number of fixed updates owed at frame time `perf`.
    /// Backlog beyond MAX_SUBSTEPS is dropped rather than replayed.
    pub fn advance(&mut self, perf: f64) -> u32 {
        self.accumulated_delta += (perf - self.last_frame).max(0.0);
        self.last_frame = perf;

        let mut steps = 0;
        while self.accumulated_delta > FRAME_SIZE && steps < MAX_SUBSTEPS {
            self.accumulated_delta -= FRAME_SIZE;
            steps += 1;
        }
        if steps == MAX_SUBSTEPS {
            self.accumulated_delta = 0.0;
        }
        steps
    }

    pub async fn start(game: impl Game + 'static) -> Result<()> {
        let game: SharedGame = Rc::new(RefCell::new(game.initialize().await?));
        let renderer = Renderer::new(browser::context()?);
        let events = input::prepare_input()?;
        let mut restarts =
            input::add_click_handler(&browser::element_by_id(html::RESTART_BUTTON_ID)?);

        let timing = Rc::new(RefCell::new(GameLoop::new(browser::now()?)));
        let frame_pending = Rc::new(Cell::new(false));
        let interval_id: Rc<Cell<Option<i32>>> = Rc::new(Cell::new(None));

        let f: SharedLoopClosure = Rc::new(RefCell::new(None));
        let g = f.clone();
        {
            let game = game.clone();
            let timing = timing.clone();
            let frame_pending = frame_pending.clone();
            let events = events.clone();
            *g.borrow_mut() = Some(browser::create_raf_closure(move |perf: f64| {
                frame_pending.set(false);
                // not rescheduling is how the loop stops
                if !game.borrow().is_running() {
                    events.borrow_mut().pause();
                    return;
                }
                let mut game = game.borrow_mut();
                input::drain(&events, |event| game.handle_input(event));
                let steps = timing.borrow_mut().advance(perf);
                for _ in 0..steps {
                    game.update();
                }
                game.draw(&renderer);

                if let Some(frame) = f.borrow().as_ref() {
                    match browser::request_animation_frame(frame) {
                        Ok(_) => frame_pending.set(true),
                        Err(err) => log::error!("GameLoop: {:#}", err),
                    }
                }
            }));
        }

        let second = {
            let game = game.clone();
            let interval_id = interval_id.clone();
            let events = events.clone();
            Rc::new(browser::create_interval_closure(move || {
                let mut game = game.borrow_mut();
                game.on_second();
                if !game.is_running() {
                    events.borrow_mut().pause();
                    if let Some(id) = interval_id.take() {
                        browser::clear_interval(id);
                    }
                }
            }))
        };

        let schedule = Schedule {
            game,
            timing,
            frame: g,
            frame_pending,
            second,
            interval_id,
            events,
        };
        schedule.arm()?;

        browser::spawn_local(async move {
            while restarts.next().await.is_some() {
                if let Err(err) = schedule.restart() {
                    log::error!("Restart failed: {:#}", err);
                }
            }
        });

        Ok(())
    }
}

/// Handles on the two periodic callbacks, so restart can bring them back
struct Schedule {
    game: SharedGame,
    timing: Rc<RefCell<GameLoop>>,
    frame: SharedLoopClosure,
    frame_pending: Rc<Cell<bool>>,
    second: Rc<browser::IntervalClosure>,
    interval_id: Rc<Cell<Option<i32>>>,
    events: input::SharedInput,
}

impl Schedule {
    /// Make sure both the frame loop and the session clock are scheduled
    fn arm(&self) -> Result<()> {
        if self.interval_id.get().is_none() {
            self.interval_id
                .set(Some(browser::set_interval(&self.second, SECOND_MS)?));
        }
        if !self.frame_pending.get() {
            if let Some(frame) = self.frame.borrow().as_ref() {
                browser::request_animation_frame(frame)?;
                self.frame_pending.set(true);
            }
        }
        Ok(())
    }

    fn restart(&self) -> Result<()> {
        self.game.borrow_mut().restart();
        self.events.borrow_mut().resume();
        self.timing.borrow_mut().reset(browser::now()?);
        self.arm()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Rect {
            x,
            y,
            width,
            height,
        }
    }
}

/// Fill + outline for closed shapes
pub struct ShapeStyle<'a> {
    pub fill: &'a str,
    pub stroke: &'a str,
    pub line_width: f64,
}

pub struct Renderer {
    context: CanvasRenderingContext2d,
}

impl Renderer {
    pub fn new(context: CanvasRenderingContext2d) -> Self {
        Renderer { context }
    }

    pub fn clear(&self, rect: &Rect) {
        self.context
            .clear_rect(rect.x, rect.y, rect.width, rect.height);
    }

    pub fn fill_rect(&self, rect: &Rect, color: &str) {
        self.context.set_fill_style_str(color);
        self.context
            .fill_rect(rect.x, rect.y, rect.width, rect.height);
    }

    /// Text glyph centered on `center`, `size` px tall
    pub fn fill_glyph(&self, glyph: &str, center: Point, size: f64, color: &str) {
        self.context.set_font(&format!("{}px serif", size));
        self.context.set_text_align("center");
        self.context.set_text_baseline("middle");
        self.context.set_fill_style_str(color);
        warn_on_failure(
            "fill_glyph",
            self.context.fill_text(glyph, center.x, center.y),
        );
    }

    pub fn rounded_rect(&self, rect: &Rect, radius: f64, style: &ShapeStyle) {
        let Rect {
            x,
            y,
            width: w,
            height: h,
        } = *rect;
        let context = &self.context;
        context.set_fill_style_str(style.fill);
        context.set_stroke_style_str(style.stroke);
        context.set_line_width(style.line_width);

        context.begin_path();
        context.move_to(x + radius, y);
        let corners = context
            .arc_to(x + w, y, x + w, y + h, radius)
            .and_then(|_| context.arc_to(x + w, y + h, x, y + h, radius))
            .and_then(|_| context.arc_to(x, y + h, x, y, radius))
            .and_then(|_| context.arc_to(x, y, x + w, y, radius));
        warn_on_failure("rounded_rect", corners);
        context.close_path();
        context.fill();
        context.stroke();
    }

    pub fn line(&self, from: Point, to: Point, color: &str, line_width: f64) {
        self.context.set_stroke_style_str(color);
        self.context.set_line_width(line_width);
        self.context.begin_path();
        self.context.move_to(from.x, from.y);
        self.context.line_to(to.x, to.y);
        self.context.stroke();
    }
}

fn warn_on_failure(what: &str, result: Result<(), JsValue>) {
    if let Err(err) = result {
        log::warn!("Renderer::{} failed : {:#?}", what, err);
    }
}

pub mod input {
    use crate::browser;
    use anyhow::{anyhow, Result};
    use futures::channel::mpsc::{unbounded, UnboundedReceiver};
    use std::cell::RefCell;
    use std::mem;
    use std::rc::Rc;
    use wasm_bindgen::closure::{Closure, WasmClosure};
    use wasm_bindgen::JsCast;
    use web_sys::{EventTarget, HtmlElement, KeyboardEvent, PointerEvent, TouchEvent};

    /// Input as the game sees it, already translated to surface coordinates
    #[derive(Debug, Clone, PartialEq)]
    pub enum InputEvent {
        /// container-local horizontal pointer position
        PointerMove { x: f64 },
        /// `KeyboardEvent.key`, e.g. "ArrowLeft"
        KeyDown(String),
        /// the canvas was refitted to a new CSS size
        Resize { width: f64, height: f64 },
    }

    pub type SharedInput = Rc<RefCell<InputQueue>>;

    /// Events waiting for the next frame.
    /// While paused only the latest surface size is kept, everything else is dropped.
    #[derive(Debug, Default, PartialEq)]
    pub struct InputQueue {
        paused: bool,
        events: Vec<InputEvent>,
        resize: Option<(f64, f64)>,
    }

    impl InputQueue {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn push(&mut self, event: InputEvent) {
            match event {
                InputEvent::Resize { width, height } if self.paused => {
                    self.resize = Some((width, height));
                }
                _ if self.paused => {}
                event => self.events.push(event),
            }
        }

        /// Stop queueing, folding whatever was queued down to its last resize
        pub fn pause(&mut self) {
            if self.paused {
                return;
            }
            self.paused = true;
            for event in mem::take(&mut self.events) {
                self.push(event);
            }
        }

        pub fn resume(&mut self) {
            self.paused = false;
        }

        pub fn is_paused(&self) -> bool {
            self.paused
        }

        pub fn len(&self) -> usize {
            self.events.len() + usize::from(self.resize.is_some())
        }

        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }

        /// Everything queued, a resize kept across a pause first
        pub fn take(&mut self) -> Vec<InputEvent> {
            let resize = self
                .resize
                .take()
                .map(|(width, height)| InputEvent::Resize { width, height });
            resize.into_iter().chain(mem::take(&mut self.events)).collect()
        }
    }

    /// Hook pointer, touch, keyboard and resize listeners up to one queue
    pub fn prepare_input() -> Result<SharedInput> {
        let queue: SharedInput = Rc::new(RefCell::new(InputQueue::new()));
        let container = browser::container()?;
        let window = browser::window()?;

        let pointer_queue = queue.clone();
        let onpointermove = browser::closure_wrap(Box::new(move |event: PointerEvent| {
            send_pointer(&pointer_queue, f64::from(event.client_x()));
        }) as Box<dyn FnMut(PointerEvent)>);
        listen(&container, "pointermove", onpointermove)?;

        let touch_queue = queue.clone();
        let ontouchmove = browser::closure_wrap(Box::new(move |event: TouchEvent| {
            if let Some(touch) = event.touches().get(0) {
                send_pointer(&touch_queue, f64::from(touch.client_x()));
            }
        }) as Box<dyn FnMut(TouchEvent)>);
        listen(&container, "touchmove", ontouchmove)?;

        let key_queue = queue.clone();
        let onkeydown = browser::closure_wrap(Box::new(move |event: KeyboardEvent| {
            key_queue.borrow_mut().push(InputEvent::KeyDown(event.key()));
        }) as Box<dyn FnMut(KeyboardEvent)>);
        listen(&window, "keydown", onkeydown)?;

        let resize_queue = queue.clone();
        let onresize = browser::closure_wrap(Box::new(move || match browser::fit_canvas() {
            Ok((width, height)) => {
                log::info!("Surface resized to {}x{}", width, height);
                resize_queue
                    .borrow_mut()
                    .push(InputEvent::Resize { width, height });
            }
            Err(err) => log::warn!("Could not refit canvas: {:#}", err),
        }) as Box<dyn FnMut()>);
        listen(&window, "resize", onresize)?;

        Ok(queue)
    }

    fn send_pointer(queue: &SharedInput, client_x: f64) {
        match browser::container_local_x(client_x) {
            Ok(x) => queue.borrow_mut().push(InputEvent::PointerMove { x }),
            Err(err) => log::warn!("Dropped pointer event: {:#}", err),
        }
    }

    /// Listeners live as long as the page, so the closure is leaked on purpose
    fn listen<T: ?Sized + WasmClosure>(
        target: &EventTarget,
        kind: &str,
        callback: Closure<T>,
    ) -> Result<()> {
        target
            .add_event_listener_with_callback(kind, callback.as_ref().unchecked_ref())
            .map_err(|err| anyhow!("Could not listen for {} : {:#?}", kind, err))?;
        callback.forget();
        Ok(())
    }

    /// Feed everything queued since the last frame to `handle`
    pub fn drain(queue: &SharedInput, mut handle: impl FnMut(&InputEvent)) {
        // released before handling, listeners may fire while the game reacts
        let events = queue.borrow_mut().take();
        for event in &events {
            handle(event);
        }
    }

    pub fn add_click_handler(elem: &HtmlElement) -> UnboundedReceiver<()> {
        let (click_sender, click_receiver) = unbounded();
        let on_click = browser::closure_wrap(Box::new(move || {
            let _ = click_sender.unbounded_send(());
        }) as Box<dyn FnMut()>);
        elem.set_onclick(Some(on_click.as_ref().unchecked_ref()));
        on_click.forget();
        click_receiver
    }
}

#[cfg(test)]
mod tests {
    use super::input::{InputEvent, InputQueue};
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn one_update_per_sixtieth_of_a_second() {
        let mut timing = GameLoop::new(1000.0);
        assert_eq!(timing.advance(1000.0), 0);
        assert_eq!(timing.advance(1000.0 + FRAME_SIZE + 0.5), 1);
        // leftover half millisecond carries into the next frame
        assert_eq!(timing.advance(1000.0 + 2.0 * FRAME_SIZE + 0.2), 1);
        assert_relative_eq!(timing.accumulated_delta, 0.2, epsilon = 1e-9);
    }

    #[test]
    fn long_gap_is_capped_and_dropped() {
        let mut timing = GameLoop::new(0.0);
        assert_eq!(timing.advance(5_000.0), MAX_SUBSTEPS);
        // backlog is gone, next frame is a normal one
        assert_eq!(timing.advance(5_000.0 + FRAME_SIZE + 0.1), 1);
    }

    #[test]
    fn reset_forgets_elapsed_time() {
        let mut timing = GameLoop::new(0.0);
        timing.reset(10_000.0);
        assert_eq!(timing.advance(10_000.0), 0);
        assert_eq!(timing, GameLoop::new(10_000.0));
    }

    #[test]
    fn clock_going_backwards_owes_nothing() {
        let mut timing = GameLoop::new(500.0);
        assert_eq!(timing.advance(490.0), 0);
        assert_relative_eq!(timing.accumulated_delta, 0.0);
    }

    #[test]
    fn running_queue_keeps_events_in_order() {
        let mut queue = InputQueue::new();
        queue.push(InputEvent::PointerMove { x: 12.0 });
        queue.push(InputEvent::KeyDown("ArrowLeft".into()));
        queue.push(InputEvent::Resize {
            width: 300.0,
            height: 500.0,
        });

        assert_eq!(
            queue.take(),
            vec![
                InputEvent::PointerMove { x: 12.0 },
                InputEvent::KeyDown("ArrowLeft".into()),
                InputEvent::Resize {
                    width: 300.0,
                    height: 500.0
                },
            ]
        );
        assert!(queue.is_empty());
    }

    #[test]
    fn paused_queue_holds_at_most_the_last_resize() {
        let mut queue = InputQueue::new();
        queue.push(InputEvent::PointerMove { x: 1.0 });
        queue.push(InputEvent::Resize {
            width: 320.0,
            height: 480.0,
        });
        queue.pause();
        assert_eq!(queue.len(), 1);

        for i in 0..10_000 {
            queue.push(InputEvent::PointerMove { x: f64::from(i) });
            queue.push(InputEvent::KeyDown("ArrowRight".into()));
            if i % 1_000 == 0 {
                queue.push(InputEvent::Resize {
                    width: f64::from(i),
                    height: 600.0,
                });
            }
            assert!(queue.len() <= 1);
        }

        queue.resume();
        assert_eq!(
            queue.take(),
            vec![InputEvent::Resize {
                width: 9_000.0,
                height: 600.0
            }]
        );
    }

    #[test]
    fn resumed_queue_applies_kept_resize_first() {
        let mut queue = InputQueue::new();
        queue.pause();
        queue.push(InputEvent::Resize {
            width: 200.0,
            height: 400.0,
        });
        // pausing twice must not lose what is held
        queue.pause();
        queue.resume();
        assert!(!queue.is_paused());
        queue.push(InputEvent::PointerMove { x: 50.0 });

        assert_eq!(
            queue.take(),
            vec![
                InputEvent::Resize {
                    width: 200.0,
                    height: 400.0
                },
                InputEvent::PointerMove { x: 50.0 },
            ]
        );
    }
}
