use crate::browser::{self, html};
use crate::config::{GameConfig, CONFIG_PATH};
use crate::engine::input::InputEvent;
use crate::engine::{self, Game, Point, Rect, Renderer, ShapeStyle};
use crate::sim::{self, Direction, GameEvent, Session, Surface};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use web_sys::HtmlElement;

/// Update / draw flow
/// - engine::GameLoop  -> handle_input() for every queued InputEvent
///                     -> update() once per FRAME_SIZE owed -> sim::step
///                     -> draw() once per display frame
/// - session clock     -> on_second() -> Session::tick_second
/// - restart button    -> restart()
/// Every Session mutation queues GameEvents, which the Hud turns into DOM text.
pub enum CroissantCatch {
    Loading,
    Loaded(Catch),
}

pub struct Catch {
    session: Session,
    hud: Hud,
}

mod palette {
    pub const BACKGROUND: &str = "#fff0e5";
    pub const CROISSANT: &str = "#5a3d2b";
    pub const BASKET_STROKE: &str = "#8a5b3a";
    pub const BASKET_EDGE: &str = "#3e2a1e";
}

const CROISSANT_GLYPH: &str = "\u{1F950}";
const BASKET_RADIUS: f64 = 8.0;
const BASKET_LINE_WIDTH: f64 = 2.0;
// decorative rim, inset from the basket's top corners
const EDGE_INSET: Point = Point { x: 8.0, y: 6.0 };
const EDGE_LINE_WIDTH: f64 = 1.5;

impl CroissantCatch {
    pub fn new() -> Self {
        CroissantCatch::Loading
    }
}

impl Default for CroissantCatch {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait(?Send)]
impl Game for CroissantCatch {
    async fn initialize(&self) -> Result<Box<dyn Game>> {
        match self {
            CroissantCatch::Loading => {
                let config = GameConfig::load(CONFIG_PATH).await;
                let (width, height) =
                    browser::fit_canvas().context("Failed to fit canvas to its container")?;
                let session =
                    Session::new(config, Surface::new(width, height), Pcg32::from_entropy());
                let hud = Hud::find().context("Failed to find score board elements")?;
                hud.reset(&session)?;
                log::info!("Session started on a {}x{} surface", width, height);
                Ok(Box::new(CroissantCatch::Loaded(Catch { session, hud })))
            }
            CroissantCatch::Loaded(_) => Err(anyhow!("Game is already initialized")),
        }
    }

    fn handle_input(&mut self, event: &InputEvent) {
        if let CroissantCatch::Loaded(catch) = self {
            let session = &mut catch.session;
            match event {
                InputEvent::PointerMove { x } => session.set_catcher_center_x(*x),
                InputEvent::KeyDown(key) => match key.as_str() {
                    "ArrowLeft" => session.nudge_catcher(Direction::Left),
                    "ArrowRight" => session.nudge_catcher(Direction::Right),
                    _ => {}
                },
                InputEvent::Resize { width, height } => session.resize(*width, *height),
            }
        }
    }

    fn update(&mut self) {
        if let CroissantCatch::Loaded(catch) = self {
            sim::step(&mut catch.session, engine::FRAME_SIZE);
            catch.publish_events();
        }
    }

    fn draw(&self, renderer: &Renderer) {
        if let CroissantCatch::Loaded(catch) = self {
            catch.draw(renderer);
        }
    }

    fn on_second(&mut self) {
        if let CroissantCatch::Loaded(catch) = self {
            catch.session.tick_second();
            catch.publish_events();
        }
    }

    fn restart(&mut self) {
        if let CroissantCatch::Loaded(catch) = self {
            catch.session.restart();
            if let Err(err) = catch.hud.reset(&catch.session) {
                log::warn!("Could not reset score board: {:#}", err);
            }
            log::info!("Session restarted");
        }
    }

    fn is_running(&self) -> bool {
        match self {
            CroissantCatch::Loaded(catch) => catch.session.running,
            CroissantCatch::Loading => false,
        }
    }
}

impl Catch {
    fn publish_events(&mut self) {
        for event in self.session.drain_events() {
            if let GameEvent::GameOver { final_score } = event {
                log::info!("Game over, final score {}", final_score);
            }
            if let Err(err) = self.hud.show(event) {
                log::warn!("Could not update score board: {:#}", err);
            }
        }
    }

    // Draw order matters : background -> croissants -> basket
    fn draw(&self, renderer: &Renderer) {
        let surface = self.session.surface;
        let screen = Rect::new(0.0, 0.0, surface.width, surface.height);
        renderer.clear(&screen);
        renderer.fill_rect(&screen, palette::BACKGROUND);

        for object in &self.session.objects {
            renderer.fill_glyph(
                CROISSANT_GLYPH,
                Point {
                    x: object.x,
                    y: object.y,
                },
                object.size,
                palette::CROISSANT,
            );
        }

        let basket = Basket::of(&self.session);
        renderer.rounded_rect(
            &basket.body,
            BASKET_RADIUS,
            &ShapeStyle {
                fill: self.session.catcher.color,
                stroke: palette::BASKET_STROKE,
                line_width: BASKET_LINE_WIDTH,
            },
        );
        renderer.line(
            basket.rim_start,
            basket.rim_end,
            palette::BASKET_EDGE,
            EDGE_LINE_WIDTH,
        );
    }
}

/// Where the catcher ends up on screen
#[derive(Debug, Clone, Copy, PartialEq)]
struct Basket {
    body: Rect,
    rim_start: Point,
    rim_end: Point,
}

impl Basket {
    fn of(session: &Session) -> Self {
        let catcher = &session.catcher;
        let top = session.surface.height - session.config.catcher.bottom_offset;
        let rim_y = top + EDGE_INSET.y;
        Basket {
            body: Rect::new(catcher.x, top, catcher.width, catcher.height),
            rim_start: Point {
                x: catcher.x + EDGE_INSET.x,
                y: rim_y,
            },
            rim_end: Point {
                x: catcher.x + catcher.width - EDGE_INSET.x,
                y: rim_y,
            },
        }
    }
}

/// Score, timer and game over overlay from the host page
struct Hud {
    score: HtmlElement,
    timer: HtmlElement,
    game_over: HtmlElement,
    final_score: HtmlElement,
}

impl Hud {
    fn find() -> Result<Self> {
        Ok(Hud {
            score: browser::element_by_id(html::SCORE_ID)?,
            timer: browser::element_by_id(html::TIMER_ID)?,
            game_over: browser::element_by_id(html::GAME_OVER_ID)?,
            final_score: browser::element_by_id(html::FINAL_SCORE_ID)?,
        })
    }

    fn reset(&self, session: &Session) -> Result<()> {
        browser::set_text(&self.score, &session.score.to_string());
        browser::set_text(&self.timer, &session.time_remaining.to_string());
        browser::set_hidden(&self.game_over, true)
    }

    fn show(&self, event: GameEvent) -> Result<()> {
        match event {
            GameEvent::Caught { score } => browser::set_text(&self.score, &score.to_string()),
            GameEvent::Tick { time_remaining } => {
                browser::set_text(&self.timer, &time_remaining.to_string())
            }
            GameEvent::GameOver { final_score } => {
                browser::set_text(&self.final_score, &final_score.to_string());
                browser::set_hidden(&self.game_over, false)?;
            }
            GameEvent::Missed => {}
        }
        Ok(())
    }
}
