//! Pan and zoom for the map layers.
//!
//! [`ZoomBehavior`] turns wheel, drag, touch and double-click gestures into a
//! [`ZoomTransform`]. [`Zoom`] applies every new transform to the layer
//! elements as a CSS transform, shrinking the stroke width so lines keep
//! their on-screen thickness. In the browser, [`dom::enable_zoom`] feeds it
//! DOM events.

#[cfg(target_arch = "wasm32")]
pub mod dom;

use crate::config::ZoomConfig;

/// Translation and scale produced by a pan/zoom gesture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomTransform {
    pub x: f64,
    pub y: f64,
    pub k: f64,
}

impl Default for ZoomTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl ZoomTransform {
    pub const IDENTITY: ZoomTransform = ZoomTransform {
        x: 0.0,
        y: 0.0,
        k: 1.0,
    };

    pub fn new(x: f64, y: f64, k: f64) -> Self {
        Self { x, y, k }
    }

    /// Maps a point from layer space to screen space.
    pub fn apply(&self, point: [f64; 2]) -> [f64; 2] {
        [point[0] * self.k + self.x, point[1] * self.k + self.y]
    }

    /// Maps a point from screen space back to layer space.
    pub fn invert(&self, point: [f64; 2]) -> [f64; 2] {
        [(point[0] - self.x) / self.k, (point[1] - self.y) / self.k]
    }

    /// Returns the transform with the scale replaced.
    fn with_scale(self, k: f64) -> Self {
        Self { k, ..self }
    }

    /// Returns the transform translated so that layer point `layer` sits
    /// under screen point `screen`.
    fn anchored(self, screen: [f64; 2], layer: [f64; 2]) -> Self {
        Self {
            x: screen[0] - layer[0] * self.k,
            y: screen[1] - layer[1] * self.k,
            k: self.k,
        }
    }

    /// CSS `transform` value for this transform.
    pub fn css_transform(&self) -> String {
        format!("translate({}px, {}px) scale({})", self.x, self.y, self.k)
    }

    /// CSS `stroke-width` value that renders `base_width` pixels on screen.
    pub fn css_stroke_width(&self, base_width: f64) -> String {
        format!("{}px", base_width / self.k)
    }
}

/// Something whose inline style can be changed, like a DOM element.
pub trait StyleTarget {
    fn set_style_property(&self, name: &str, value: &str);
}

impl<T: StyleTarget + ?Sized> StyleTarget for &T {
    fn set_style_property(&self, name: &str, value: &str) {
        (**self).set_style_property(name, value);
    }
}

impl<T: StyleTarget + ?Sized> StyleTarget for std::rc::Rc<T> {
    fn set_style_property(&self, name: &str, value: &str) {
        (**self).set_style_property(name, value);
    }
}

/// Styles `element` for the given transform.
pub fn zoom_transform_fn<E: StyleTarget + ?Sized>(
    element: &E,
    transform: &ZoomTransform,
    stroke_width: f64,
) {
    element.set_style_property("stroke-width", &transform.css_stroke_width(stroke_width));
    element.set_style_property("transform", &transform.css_transform());
}

/// A reference to a layer element: either the element itself or a list of
/// elements of which the first is the one to transform.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementRef<E> {
    Single(E),
    List(Vec<E>),
}

impl<E> ElementRef<E> {
    /// Returns the element to transform, if any.
    pub fn element(&self) -> Option<&E> {
        match self {
            ElementRef::Single(e) => Some(e),
            ElementRef::List(list) => list.first(),
        }
    }
}

impl<E> From<E> for ElementRef<E> {
    fn from(element: E) -> Self {
        ElementRef::Single(element)
    }
}

/// The root map element plus the named layer elements it transforms.
#[derive(Debug, Clone)]
pub struct ZoomTargets<E> {
    root: E,
    refs: Vec<(String, Option<ElementRef<E>>)>,
}

impl<E> ZoomTargets<E> {
    /// Creates targets for gestures on `root`. The root is not transformed.
    pub fn new(root: E) -> Self {
        Self {
            root,
            refs: Vec::new(),
        }
    }

    /// Adds a named reference. A `None` reference is kept and skipped.
    pub fn with_ref(mut self, name: impl Into<String>, element: Option<ElementRef<E>>) -> Self {
        self.insert(name, element);
        self
    }

    /// Adds or replaces a named reference.
    pub fn insert(&mut self, name: impl Into<String>, element: Option<ElementRef<E>>) {
        let name = name.into();
        match self.refs.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = element,
            None => self.refs.push((name, element)),
        }
    }

    pub fn root(&self) -> &E {
        &self.root
    }

    /// Returns the resolved elements; missing references are skipped.
    pub fn elements(&self) -> impl Iterator<Item = &E> {
        self.refs
            .iter()
            .filter_map(|(_, element)| element.as_ref().and_then(ElementRef::element))
    }

    /// Returns the reference names whose element is missing.
    pub fn missing(&self) -> impl Iterator<Item = &str> {
        self.refs
            .iter()
            .filter(|(_, element)| element.as_ref().and_then(ElementRef::element).is_none())
            .map(|(name, _)| name.as_str())
    }
}

/// How a wheel event's delta is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaMode {
    Pixel,
    Line,
    Page,
}

impl DeltaMode {
    /// Maps `WheelEvent.deltaMode`.
    pub fn from_dom(mode: u32) -> Self {
        match mode {
            1 => DeltaMode::Line,
            2 => DeltaMode::Page,
            _ => DeltaMode::Pixel,
        }
    }

    fn factor(&self) -> f64 {
        match self {
            DeltaMode::Pixel => 0.002,
            DeltaMode::Line => 0.05,
            DeltaMode::Page => 1.0,
        }
    }
}

/// Input understood by [`ZoomBehavior`]. Points are relative to the root.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ZoomGesture {
    /// `ctrl` is set for trackpad pinches, which arrive as wheel events
    /// with the control key held.
    Wheel {
        point: [f64; 2],
        delta_y: f64,
        mode: DeltaMode,
        ctrl: bool,
    },
    DoubleClick {
        point: [f64; 2],
        shift: bool,
    },
    DragStart {
        point: [f64; 2],
    },
    DragMove {
        point: [f64; 2],
    },
    DragEnd,
    /// A finger touched down. Only the first two fingers are tracked.
    TouchStart {
        id: i32,
        point: [f64; 2],
    },
    /// A tracked finger moved: one finger pans, two fingers pinch.
    TouchMove {
        id: i32,
        point: [f64; 2],
    },
    /// A finger lifted or the touch was cancelled.
    TouchEnd {
        id: i32,
    },
    /// Programmatic jump to a transform; the scale is still clamped.
    Set(ZoomTransform),
}

/// A tracked finger: where it is now and the layer point it holds.
#[derive(Debug, Clone, Copy, PartialEq)]
struct TouchAnchor {
    id: i32,
    point: [f64; 2],
    anchor: [f64; 2],
}

/// Gesture-to-transform state machine with a scale extent.
#[derive(Debug, Clone)]
pub struct ZoomBehavior {
    min_scale: f64,
    max_scale: f64,
    transform: ZoomTransform,
    /// Layer point under the pointer when the drag started.
    drag_anchor: Option<[f64; 2]>,
    touches: Vec<TouchAnchor>,
}

impl Default for ZoomBehavior {
    fn default() -> Self {
        Self::new(&ZoomConfig::default())
    }
}

impl ZoomBehavior {
    pub fn new(config: &ZoomConfig) -> Self {
        let (min_scale, max_scale) = config.scale_extent();
        Self {
            min_scale,
            max_scale,
            transform: ZoomTransform::IDENTITY,
            drag_anchor: None,
            touches: Vec::with_capacity(2),
        }
    }

    pub fn transform(&self) -> ZoomTransform {
        self.transform
    }

    pub fn scale_extent(&self) -> (f64, f64) {
        (self.min_scale, self.max_scale)
    }

    pub fn is_dragging(&self) -> bool {
        self.drag_anchor.is_some()
    }

    /// Number of fingers currently tracked.
    pub fn touch_count(&self) -> usize {
        self.touches.len()
    }

    /// Applies a gesture. Returns the new transform if it changed.
    pub fn handle(&mut self, gesture: ZoomGesture) -> Option<ZoomTransform> {
        let t = self.transform;
        let next = match gesture {
            ZoomGesture::Wheel {
                point,
                delta_y,
                mode,
                ctrl,
            } => {
                let boost = if ctrl { 10.0 } else { 1.0 };
                let k = self.clamp(t.k * 2f64.powf(-delta_y * mode.factor() * boost));
                if k == t.k {
                    return None;
                }
                t.with_scale(k).anchored(point, t.invert(point))
            }
            ZoomGesture::DoubleClick { point, shift } => {
                let factor = if shift { 0.5 } else { 2.0 };
                let k = self.clamp(t.k * factor);
                t.with_scale(k).anchored(point, t.invert(point))
            }
            ZoomGesture::DragStart { point } => {
                self.drag_anchor = Some(t.invert(point));
                return None;
            }
            ZoomGesture::DragMove { point } => {
                let anchor = self.drag_anchor?;
                t.anchored(point, anchor)
            }
            ZoomGesture::DragEnd => {
                self.drag_anchor = None;
                return None;
            }
            ZoomGesture::TouchStart { id, point } => {
                if self.touches.len() < 2 && self.touches.iter().all(|touch| touch.id != id) {
                    self.touches.push(TouchAnchor {
                        id,
                        point,
                        anchor: t.invert(point),
                    });
                }
                return None;
            }
            ZoomGesture::TouchMove { id, point } => {
                let touch = self.touches.iter_mut().find(|touch| touch.id == id)?;
                touch.point = point;
                self.touch_transform(t)?
            }
            ZoomGesture::TouchEnd { id } => {
                self.touches.retain(|touch| touch.id != id);
                // The remaining finger takes over from where it is now.
                for touch in &mut self.touches {
                    touch.anchor = t.invert(touch.point);
                }
                return None;
            }
            ZoomGesture::Set(transform) => transform.with_scale(self.clamp(transform.k)),
        };

        if next == t {
            return None;
        }
        self.transform = next;
        Some(next)
    }

    /// Pans so one finger keeps its layer point, or pinches so two
    /// fingers keep theirs as closely as the scale extent allows.
    fn touch_transform(&self, t: ZoomTransform) -> Option<ZoomTransform> {
        match self.touches.as_slice() {
            [only] => Some(t.anchored(only.point, only.anchor)),
            [a, b] => {
                let screen = distance_squared(a.point, b.point);
                let layer = distance_squared(a.anchor, b.anchor);
                let k = if layer > 0.0 {
                    self.clamp((screen / layer).sqrt())
                } else {
                    t.k
                };
                Some(
                    t.with_scale(k)
                        .anchored(midpoint(a.point, b.point), midpoint(a.anchor, b.anchor)),
                )
            }
            _ => None,
        }
    }

    fn clamp(&self, k: f64) -> f64 {
        k.clamp(self.min_scale, self.max_scale)
    }
}

/// Converts viewport coordinates to coordinates relative to a root element
/// whose top-left corner is at `origin`.
pub fn client_to_root(client: [f64; 2], origin: [f64; 2]) -> [f64; 2] {
    [client[0] - origin[0], client[1] - origin[1]]
}

fn distance_squared(a: [f64; 2], b: [f64; 2]) -> f64 {
    let (dx, dy) = (b[0] - a[0], b[1] - a[1]);
    dx * dx + dy * dy
}

fn midpoint(a: [f64; 2], b: [f64; 2]) -> [f64; 2] {
    [(a[0] + b[0]) / 2.0, (a[1] + b[1]) / 2.0]
}

/// Zoom behavior wired to a set of elements.
#[derive(Debug)]
pub struct Zoom<E> {
    behavior: ZoomBehavior,
    targets: ZoomTargets<E>,
    stroke_width: f64,
}

/// Enables pan/zoom: every transform change restyles the target elements.
pub fn enable_zoom<E: StyleTarget>(targets: ZoomTargets<E>, config: &ZoomConfig) -> Zoom<E> {
    let missing: Vec<&str> = targets.missing().collect();
    if !missing.is_empty() {
        log::debug!("Zoom targets without an element: {}", missing.join(", "));
    }
    Zoom {
        behavior: ZoomBehavior::new(config),
        targets,
        stroke_width: config.stroke_width,
    }
}

impl<E: StyleTarget> Zoom<E> {
    /// Feeds a gesture; restyles the elements and returns true if the
    /// transform changed.
    pub fn handle(&mut self, gesture: ZoomGesture) -> bool {
        match self.behavior.handle(gesture) {
            Some(transform) => {
                self.apply(&transform);
                true
            }
            None => false,
        }
    }

    /// Styles every resolved element for `transform`.
    pub fn apply(&self, transform: &ZoomTransform) {
        for element in self.targets.elements() {
            zoom_transform_fn(element, transform, self.stroke_width);
        }
    }

    pub fn transform(&self) -> ZoomTransform {
        self.behavior.transform()
    }

    pub fn is_dragging(&self) -> bool {
        self.behavior.is_dragging()
    }

    pub fn targets(&self) -> &ZoomTargets<E> {
        &self.targets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    #[derive(Debug, Default)]
    struct FakeElement {
        style: RefCell<HashMap<String, String>>,
    }

    impl FakeElement {
        fn style(&self, name: &str) -> Option<String> {
            self.style.borrow().get(name).cloned()
        }
    }

    impl StyleTarget for FakeElement {
        fn set_style_property(&self, name: &str, value: &str) {
            self.style
                .borrow_mut()
                .insert(name.to_string(), value.to_string());
        }
    }

    fn assert_transform(actual: ZoomTransform, x: f64, y: f64, k: f64) {
        assert!(
            (actual.x - x).abs() < 1e-9 && (actual.y - y).abs() < 1e-9 && (actual.k - k).abs() < 1e-9,
            "expected ({}, {}, {}), got {:?}",
            x,
            y,
            k,
            actual
        );
    }

    #[test]
    fn test_transform_fn_sets_css() {
        let element = FakeElement::default();
        zoom_transform_fn(&element, &ZoomTransform::new(10.0, 20.0, 2.0), 1.5);
        assert_eq!(
            element.style("transform").as_deref(),
            Some("translate(10px, 20px) scale(2)")
        );
        assert_eq!(element.style("stroke-width").as_deref(), Some("0.75px"));
    }

    #[test]
    fn test_list_ref_uses_first_element() {
        let list = ElementRef::List(vec!["first", "second"]);
        assert_eq!(list.element(), Some(&"first"));
        assert_eq!(ElementRef::<&str>::List(Vec::new()).element(), None);
        assert_eq!(ElementRef::from("only").element(), Some(&"only"));
    }

    #[test]
    fn test_missing_refs_are_skipped() {
        let root = FakeElement::default();
        let streets = FakeElement::default();
        let freeways = FakeElement::default();
        let targets = ZoomTargets::new(&root)
            .with_ref("streets", Some(ElementRef::List(vec![&streets])))
            .with_ref("neighborhoods", None)
            .with_ref("arteries", Some(ElementRef::List(Vec::new())))
            .with_ref("freeways", Some(ElementRef::Single(&freeways)));

        assert_eq!(targets.missing().collect::<Vec<_>>(), ["neighborhoods", "arteries"]);

        let mut zoom = enable_zoom(targets, &ZoomConfig::default());
        assert!(zoom.handle(ZoomGesture::DoubleClick {
            point: [0.0, 0.0],
            shift: false,
        }));

        assert_eq!(
            streets.style("transform").as_deref(),
            Some("translate(0px, 0px) scale(2)")
        );
        assert_eq!(freeways.style("stroke-width").as_deref(), Some("0.75px"));
        assert!(root.style("transform").is_none());
    }

    #[test]
    fn test_wheel_zooms_around_pointer() {
        let mut behavior = ZoomBehavior::default();
        // 500 pixels of wheel at 0.002 per pixel doubles the scale.
        let t = behavior
            .handle(ZoomGesture::Wheel {
                point: [100.0, 50.0],
                delta_y: -500.0,
                mode: DeltaMode::Pixel,
                ctrl: false,
            })
            .unwrap();
        assert_transform(t, -100.0, -50.0, 2.0);
        // The point under the pointer stays put.
        let p = t.apply(ZoomTransform::IDENTITY.invert([100.0, 50.0]));
        assert!((p[0] - 100.0).abs() < 1e-9 && (p[1] - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_scale_is_clamped_to_extent() {
        let mut behavior = ZoomBehavior::default();
        // Zooming out at scale 1 is a no-op.
        assert!(behavior
            .handle(ZoomGesture::Wheel {
                point: [0.0, 0.0],
                delta_y: 100.0,
                mode: DeltaMode::Line,
                ctrl: false,
            })
            .is_none());

        for _ in 0..5 {
            behavior.handle(ZoomGesture::DoubleClick {
                point: [0.0, 0.0],
                shift: false,
            });
        }
        assert_eq!(behavior.transform().k, 8.0);

        let t = behavior
            .handle(ZoomGesture::DoubleClick {
                point: [0.0, 0.0],
                shift: true,
            })
            .unwrap();
        assert_eq!(t.k, 4.0);
    }

    #[test]
    fn test_drag_pans_by_pointer_delta() {
        let mut behavior = ZoomBehavior::default();
        behavior.handle(ZoomGesture::Set(ZoomTransform::new(0.0, 0.0, 2.0)));

        assert!(behavior
            .handle(ZoomGesture::DragMove { point: [5.0, 5.0] })
            .is_none());
        assert!(behavior
            .handle(ZoomGesture::DragStart { point: [10.0, 10.0] })
            .is_none());
        assert!(behavior.is_dragging());

        let t = behavior
            .handle(ZoomGesture::DragMove { point: [25.0, 4.0] })
            .unwrap();
        assert_transform(t, 15.0, -6.0, 2.0);

        behavior.handle(ZoomGesture::DragEnd);
        assert!(!behavior.is_dragging());
        assert!(behavior
            .handle(ZoomGesture::DragMove { point: [0.0, 0.0] })
            .is_none());
    }

    #[test]
    fn test_set_clamps_scale() {
        let mut behavior = ZoomBehavior::default();
        let t = behavior
            .handle(ZoomGesture::Set(ZoomTransform::new(1.0, 2.0, 100.0)))
            .unwrap();
        assert_transform(t, 1.0, 2.0, 8.0);
    }

    #[test]
    fn test_inverted_extent_does_not_panic() {
        let config = ZoomConfig {
            min_scale: 8.0,
            max_scale: 1.0,
            ..ZoomConfig::default()
        };
        let mut behavior = ZoomBehavior::new(&config);
        assert_eq!(behavior.scale_extent(), (1.0, 8.0));

        let t = behavior
            .handle(ZoomGesture::DoubleClick {
                point: [0.0, 0.0],
                shift: false,
            })
            .unwrap();
        assert_eq!(t.k, 2.0);

        let mut nan = ZoomBehavior::new(&ZoomConfig {
            max_scale: f64::NAN,
            ..ZoomConfig::default()
        });
        let t = nan
            .handle(ZoomGesture::Set(ZoomTransform::new(0.0, 0.0, 50.0)))
            .unwrap();
        assert_eq!(t.k, 8.0);
    }

    #[test]
    fn test_ctrl_wheel_zooms_ten_times_faster() {
        let mut behavior = ZoomBehavior::default();
        // 50 pixels with ctrl count like 500 without.
        let t = behavior
            .handle(ZoomGesture::Wheel {
                point: [0.0, 0.0],
                delta_y: -50.0,
                mode: DeltaMode::Pixel,
                ctrl: true,
            })
            .unwrap();
        assert_transform(t, 0.0, 0.0, 2.0);
    }

    #[test]
    fn test_one_finger_pans() {
        let mut behavior = ZoomBehavior::default();
        assert!(behavior
            .handle(ZoomGesture::TouchStart {
                id: 7,
                point: [10.0, 10.0],
            })
            .is_none());
        let t = behavior
            .handle(ZoomGesture::TouchMove {
                id: 7,
                point: [15.0, 20.0],
            })
            .unwrap();
        assert_transform(t, 5.0, 10.0, 1.0);

        // Unknown fingers are ignored.
        assert!(behavior
            .handle(ZoomGesture::TouchMove {
                id: 3,
                point: [0.0, 0.0],
            })
            .is_none());
    }

    #[test]
    fn test_two_fingers_pinch_around_midpoint() {
        let mut behavior = ZoomBehavior::default();
        behavior.handle(ZoomGesture::TouchStart {
            id: 0,
            point: [0.0, 0.0],
        });
        behavior.handle(ZoomGesture::TouchStart {
            id: 1,
            point: [10.0, 0.0],
        });
        // A third finger is not tracked.
        behavior.handle(ZoomGesture::TouchStart {
            id: 2,
            point: [50.0, 50.0],
        });
        assert_eq!(behavior.touch_count(), 2);

        // Fingers twice as far apart: scale 2, midpoint (10, 0) holds layer (5, 0).
        let t = behavior
            .handle(ZoomGesture::TouchMove {
                id: 1,
                point: [20.0, 0.0],
            })
            .unwrap();
        assert_transform(t, 0.0, 0.0, 2.0);

        // Spreading past the extent stops at the maximum scale.
        let t = behavior
            .handle(ZoomGesture::TouchMove {
                id: 1,
                point: [1000.0, 0.0],
            })
            .unwrap();
        assert_eq!(t.k, 8.0);

        // Lifting one finger leaves a pan from where the other one is.
        behavior.handle(ZoomGesture::TouchEnd { id: 1 });
        assert_eq!(behavior.touch_count(), 1);
        let before = behavior.transform();
        let t = behavior
            .handle(ZoomGesture::TouchMove {
                id: 0,
                point: [4.0, 3.0],
            })
            .unwrap();
        assert_transform(t, before.x + 4.0, before.y + 3.0, 8.0);
    }

    #[test]
    fn test_wheel_anchors_at_root_relative_point() {
        // Root at (100, 50) in the viewport, pointer at (110, 70).
        let point = client_to_root([110.0, 70.0], [100.0, 50.0]);
        assert_eq!(point, [10.0, 20.0]);

        let mut behavior = ZoomBehavior::default();
        let t = behavior
            .handle(ZoomGesture::Wheel {
                point,
                delta_y: -500.0,
                mode: DeltaMode::Pixel,
                ctrl: false,
            })
            .unwrap();
        // The layer point under the pointer stays under it.
        assert_eq!(t.apply([10.0, 20.0]), [10.0, 20.0]);
        assert_transform(t, -10.0, -20.0, 2.0);
    }
}
