use anyhow::{anyhow, Result};
use serde::de::DeserializeOwned;
use std::future::Future;
use wasm_bindgen::closure::{Closure, WasmClosure};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;

#[rustfmt::skip]
use web_sys::{
    Document,
    Window,
    CanvasRenderingContext2d,
    HtmlCanvasElement,
    HtmlElement,
    Response,
};

// ==================== Constants ====================
// Ids and classes the host page (static/index.html) provides
pub mod html {
    pub const CONTAINER_ID: &str = "gameContainer";
    pub const CANVAS_ID: &str = "gameCanvas";
    pub const CONTEXT_2D: &str = "2d";
    pub const SCORE_ID: &str = "score";
    pub const TIMER_ID: &str = "timer";
    pub const GAME_OVER_ID: &str = "gameOver";
    pub const FINAL_SCORE_ID: &str = "finalScore";
    pub const RESTART_BUTTON_ID: &str = "restartButton";
    pub const HIDDEN_CLASS: &str = "hidden";
}

pub type LoopClosure = Closure<dyn FnMut(f64)>;
pub type IntervalClosure = Closure<dyn FnMut()>;

pub fn window() -> Result<Window> {
    web_sys::window().ok_or_else(|| anyhow!("Window not found"))
}

pub fn document() -> Result<Document> {
    window()?
        .document()
        .ok_or_else(|| anyhow!("No Document Found"))
}

pub fn element_by_id(id: &str) -> Result<HtmlElement> {
    document()?
        .get_element_by_id(id)
        .ok_or_else(|| anyhow!("No Element found with ID : '{}'", id))?
        .dyn_into::<HtmlElement>()
        .map_err(|element| anyhow!("Error converting {:#?} to HtmlElement", element))
}

pub fn container() -> Result<HtmlElement> {
    element_by_id(html::CONTAINER_ID)
}

pub fn canvas() -> Result<HtmlCanvasElement> {
    document()?
        .get_element_by_id(html::CANVAS_ID)
        .ok_or_else(|| anyhow!("No Canvas Element found with ID : '{}'", html::CANVAS_ID))?
        .dyn_into::<HtmlCanvasElement>()
        .map_err(|element| anyhow!("Error converting {:#?} to HtmlCanvasElement", element))
}

pub fn context() -> Result<CanvasRenderingContext2d> {
    canvas()?
        .get_context(html::CONTEXT_2D)
        // Result<Option<Object>, JsValue>
        // - JsValue error -> anyhow
        // - None -> anyhow
        .map_err(|js_value| anyhow!("Error getting context : {:#?}", js_value))?
        .ok_or_else(|| anyhow!("No 2d context found"))?
        .dyn_into::<CanvasRenderingContext2d>()
        .map_err(|element| {
            anyhow!(
                "Error converting {:#?} to CanvasRenderingContext2d",
                element
            )
        })
}

/// Size the canvas backing store for the device pixel ratio and make the
/// context draw in CSS pixels. Returns the CSS size of the container.
pub fn fit_canvas() -> Result<(f64, f64)> {
    let rect = container()?.get_bounding_client_rect();
    let dpr = window()?.device_pixel_ratio().max(1.0);
    let css_width = rect.width().round();
    let css_height = rect.height().round();

    let canvas = canvas()?;
    canvas.set_width((css_width * dpr).floor() as u32);
    canvas.set_height((css_height * dpr).floor() as u32);
    let style = canvas.style();
    style
        .set_property("width", &format!("{}px", css_width))
        .and_then(|_| style.set_property("height", &format!("{}px", css_height)))
        .map_err(|err| anyhow!("Could not style canvas : {:#?}", err))?;

    context()?
        .set_transform(dpr, 0.0, 0.0, dpr, 0.0, 0.0)
        .map_err(|err| anyhow!("Could not scale context : {:#?}", err))?;

    Ok((css_width, css_height))
}

/// Horizontal position relative to the game container
pub fn container_local_x(client_x: f64) -> Result<f64> {
    Ok(client_x - container()?.get_bounding_client_rect().left())
}

pub fn set_text(element: &HtmlElement, text: &str) {
    element.set_text_content(Some(text));
}

pub fn set_hidden(element: &HtmlElement, hidden: bool) -> Result<()> {
    let classes = element.class_list();
    let result = if hidden {
        classes.add_1(html::HIDDEN_CLASS)
    } else {
        classes.remove_1(html::HIDDEN_CLASS)
    };
    result.map_err(|err| anyhow!("Could not toggle '{}' : {:#?}", html::HIDDEN_CLASS, err))
}

pub fn now() -> Result<f64> {
    Ok(window()?
        .performance()
        .ok_or_else(|| anyhow!("Performance object not found"))?
        .now())
}

pub fn closure_wrap<T: WasmClosure + ?Sized>(data: Box<T>) -> Closure<T> {
    Closure::wrap(data)
}

pub fn create_raf_closure(f: impl FnMut(f64) + 'static) -> LoopClosure {
    closure_wrap(Box::new(f))
}

pub fn request_animation_frame(callback: &LoopClosure) -> Result<i32> {
    window()?
        .request_animation_frame(callback.as_ref().unchecked_ref())
        .map_err(|err| anyhow!("Cannot request animation frame : {:#?}", err))
}

pub fn create_interval_closure(f: impl FnMut() + 'static) -> IntervalClosure {
    closure_wrap(Box::new(f))
}

pub fn set_interval(callback: &IntervalClosure, timeout_ms: i32) -> Result<i32> {
    window()?
        .set_interval_with_callback_and_timeout_and_arguments_0(
            callback.as_ref().unchecked_ref(),
            timeout_ms,
        )
        .map_err(|err| anyhow!("Cannot set interval : {:#?}", err))
}

/// No window means nothing was ever scheduled
pub fn clear_interval(id: i32) {
    if let Some(window) = web_sys::window() {
        window.clear_interval_with_handle(id);
    }
}

pub fn spawn_local<F>(future: F)
where
    F: Future<Output = ()> + 'static,
{
    wasm_bindgen_futures::spawn_local(future);
}

pub async fn fetch_json<T>(json_path: &str) -> Result<T>
where
    T: DeserializeOwned,
{
    let resp_value = fetch_with_str(json_path).await?;
    let resp: Response = resp_value
        .dyn_into()
        .map_err(|element| anyhow!("error converting [{:#?}] to Response", element))?;
    if !resp.ok() {
        return Err(anyhow!("{} answered with status {}", json_path, resp.status()));
    }
    let json = resp
        .json()
        .map_err(|err| anyhow!("Could not get JSON from response [{:#?}]", err))?;

    let json_value = JsFuture::from(json)
        .await
        .map_err(|err| anyhow!("error fetching [{:#?}]", err))?;

    serde_wasm_bindgen::from_value(json_value)
        .map_err(|err| anyhow!("error converting response : {:#?}", err))
}

async fn fetch_with_str(resource: &str) -> Result<JsValue> {
    let resp = window()?.fetch_with_str(resource);

    JsFuture::from(resp)
        .await
        .map_err(|err| anyhow!("error fetching : {:#?}", err))
}
