//! DOM event wiring for [`Zoom`].

use super::{client_to_root, DeltaMode, StyleTarget, Zoom, ZoomGesture, ZoomTargets};
use crate::config::ZoomConfig;
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::convert::FromWasmAbi;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Element, HtmlElement, MouseEvent, SvgElement, TouchEvent, WheelEvent};

impl StyleTarget for Element {
    fn set_style_property(&self, name: &str, value: &str) {
        let style = if let Some(html) = self.dyn_ref::<HtmlElement>() {
            html.style()
        } else if let Some(svg) = self.dyn_ref::<SvgElement>() {
            svg.style()
        } else {
            return;
        };
        if let Err(e) = style.set_property(name, value) {
            log::warn!("Failed to set {} on element: {:?}", name, e);
        }
    }
}

/// Client coordinates relative to the root's top-left corner.
///
/// Mouse offsets are relative to whichever child was hit, so they cannot
/// be used once layers are transformed.
fn pointer(root: &Element, client_x: i32, client_y: i32) -> [f64; 2] {
    let rect = root.get_bounding_client_rect();
    client_to_root([client_x as f64, client_y as f64], [rect.left(), rect.top()])
}

fn mouse_point(root: &Element, event: &MouseEvent) -> [f64; 2] {
    pointer(root, event.client_x(), event.client_y())
}

/// Calls `gesture` with the id and root-relative point of each changed touch.
fn each_changed_touch<F>(root: &Element, event: &TouchEvent, mut gesture: F)
where
    F: FnMut(i32, [f64; 2]),
{
    let touches = event.changed_touches();
    for i in 0..touches.length() {
        if let Some(touch) = touches.get(i) {
            gesture(
                touch.identifier(),
                pointer(root, touch.client_x(), touch.client_y()),
            );
        }
    }
}

fn listen<E, F>(target: &Element, event_name: &str, handler: F) -> Result<(), JsValue>
where
    E: FromWasmAbi + 'static,
    F: FnMut(E) + 'static,
{
    let closure = Closure::wrap(Box::new(handler) as Box<dyn FnMut(E)>);
    target.add_event_listener_with_callback(event_name, closure.as_ref().unchecked_ref())?;
    // The listener lives as long as the page.
    closure.forget();
    Ok(())
}

/// Enables pan/zoom on the root element of `targets`.
///
/// Wheel, drag, touch and double-click events on the root restyle every
/// resolved layer element. The returned handle can be used to read or drive the
/// transform from elsewhere.
pub fn enable_zoom(
    targets: ZoomTargets<Element>,
    config: &ZoomConfig,
) -> Result<Rc<RefCell<Zoom<Element>>>, JsValue> {
    let root = targets.root().clone();
    let zoom = Rc::new(RefCell::new(super::enable_zoom(targets, config)));

    let (z, r) = (zoom.clone(), root.clone());
    listen(&root, "wheel", move |event: WheelEvent| {
        event.prevent_default();
        z.borrow_mut().handle(ZoomGesture::Wheel {
            point: mouse_point(&r, &event),
            delta_y: event.delta_y(),
            mode: DeltaMode::from_dom(event.delta_mode()),
            ctrl: event.ctrl_key(),
        });
    })?;

    let (z, r) = (zoom.clone(), root.clone());
    listen(&root, "mousedown", move |event: MouseEvent| {
        if event.button() == 0 {
            z.borrow_mut().handle(ZoomGesture::DragStart {
                point: mouse_point(&r, &event),
            });
        }
    })?;

    let (z, r) = (zoom.clone(), root.clone());
    listen(&root, "mousemove", move |event: MouseEvent| {
        let mut zoom = z.borrow_mut();
        if zoom.is_dragging() {
            event.prevent_default();
            zoom.handle(ZoomGesture::DragMove {
                point: mouse_point(&r, &event),
            });
        }
    })?;

    for name in ["mouseup", "mouseleave"] {
        let z = zoom.clone();
        listen(&root, name, move |_: MouseEvent| {
            z.borrow_mut().handle(ZoomGesture::DragEnd);
        })?;
    }

    let (z, r) = (zoom.clone(), root.clone());
    listen(&root, "dblclick", move |event: MouseEvent| {
        event.prevent_default();
        z.borrow_mut().handle(ZoomGesture::DoubleClick {
            point: mouse_point(&r, &event),
            shift: event.shift_key(),
        });
    })?;

    let (z, r) = (zoom.clone(), root.clone());
    listen(&root, "touchstart", move |event: TouchEvent| {
        let mut zoom = z.borrow_mut();
        each_changed_touch(&r, &event, |id, point| {
            zoom.handle(ZoomGesture::TouchStart { id, point });
        });
    })?;

    let (z, r) = (zoom.clone(), root.clone());
    listen(&root, "touchmove", move |event: TouchEvent| {
        event.prevent_default();
        let mut zoom = z.borrow_mut();
        each_changed_touch(&r, &event, |id, point| {
            zoom.handle(ZoomGesture::TouchMove { id, point });
        });
    })?;

    for name in ["touchend", "touchcancel"] {
        let (z, r) = (zoom.clone(), root.clone());
        listen(&root, name, move |event: TouchEvent| {
            let mut zoom = z.borrow_mut();
            each_changed_touch(&r, &event, |id, _| {
                zoom.handle(ZoomGesture::TouchEnd { id });
            });
        })?;
    }

    log::info!("Zoom enabled on <{}>", root.tag_name().to_lowercase());
    Ok(zoom)
}
