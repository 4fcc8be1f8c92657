//! Tool and draft state machine.
//!
//! Pointer input (already in image pixels) advances the draft of the active
//! tool. Completed shapes are handed back to the caller as
//! [`ToolOutcome::Commit`]; nothing here talks to the store or the backend.

use crate::calibration::Calibration;
use crate::geometry::Point;
use crate::model::{Annotation, AnnotationTool, DrawingState, PaletteColor};

/// A pointer interaction in image pixel space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ToolInput {
    /// Single activation.
    Click(Point),
    /// Close gesture (double activation). Closes an open polygon.
    Close(Point),
}

/// What the caller needs to know to build annotations.
#[derive(Debug, Clone, Copy)]
pub struct ToolContext<'a> {
    /// Number of annotations currently in the store (for point numbering).
    pub annotation_count: usize,
    /// Calibration of the current image, if any.
    pub calibration: Option<&'a Calibration>,
    /// Colour for newly created annotations.
    pub color: PaletteColor,
}

/// Result of feeding one input to the state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    /// Nothing happened (pass-through, or a gesture the tool ignores).
    Ignored,
    /// A draft was opened or extended.
    Drafting,
    /// A shape is complete and should be added to the store.
    Commit(Annotation),
    /// The eraser was clicked here; the caller resolves which shape is hit.
    Erase(Point),
}

/// Active tool plus the in-progress draft.
#[derive(Debug, Clone, Default)]
pub struct ToolState {
    tool: AnnotationTool,
    draft: DrawingState,
}

impl ToolState {
    pub fn new() -> Self {
        Self::default()
    }

    /// The active tool.
    pub fn tool(&self) -> AnnotationTool {
        self.tool
    }

    /// The open draft, if any.
    pub fn draft(&self) -> &DrawingState {
        &self.draft
    }

    /// Switch tools. Any open draft is discarded. Returns true if a draft was
    /// dropped.
    pub fn set_tool(&mut self, tool: AnnotationTool) -> bool {
        let discarded = self.draft.is_drawing();
        if discarded {
            log::debug!("Discarding {:?} draft on tool switch", self.draft);
        }
        self.draft = DrawingState::Idle;
        self.tool = tool;
        log::debug!("🖌️ Annotation tool: {:?}", tool);
        discarded
    }

    /// Abort the open draft. Does nothing (and returns false) when idle. The
    /// active tool is left unchanged.
    pub fn cancel(&mut self) -> bool {
        if !self.draft.is_drawing() {
            return false;
        }
        self.draft = DrawingState::Idle;
        log::debug!("❌ Drawing cancelled ({})", self.tool.name());
        true
    }

    /// Advance the state machine with one input.
    pub fn handle(&mut self, input: ToolInput, ctx: &ToolContext<'_>) -> ToolOutcome {
        match self.tool {
            AnnotationTool::Select => ToolOutcome::Ignored,
            AnnotationTool::Point => self.handle_point(input, ctx),
            AnnotationTool::Measurement => self.handle_measurement(input, ctx),
            AnnotationTool::Polygon => self.handle_polygon(input, ctx),
            AnnotationTool::Eraser => match input {
                ToolInput::Click(at) => ToolOutcome::Erase(at),
                ToolInput::Close(_) => ToolOutcome::Ignored,
            },
        }
    }

    fn handle_point(&mut self, input: ToolInput, ctx: &ToolContext<'_>) -> ToolOutcome {
        let ToolInput::Click(at) = input else {
            return ToolOutcome::Ignored;
        };
        let label = format!("Point {}", ctx.annotation_count + 1);
        log::debug!("Point: {} at ({:.1}, {:.1})", label, at.x, at.y);
        ToolOutcome::Commit(Annotation::point(at, label, ctx.color))
    }

    fn handle_measurement(&mut self, input: ToolInput, ctx: &ToolContext<'_>) -> ToolOutcome {
        let ToolInput::Click(at) = input else {
            return ToolOutcome::Ignored;
        };

        match std::mem::take(&mut self.draft) {
            DrawingState::Measurement { start } => {
                let annotation = Annotation::measurement(start, at, ctx.calibration, ctx.color);
                log::debug!(
                    "Measurement: ({:.1}, {:.1}) -> ({:.1}, {:.1}) = {}",
                    start.x,
                    start.y,
                    at.x,
                    at.y,
                    annotation.label
                );
                ToolOutcome::Commit(annotation)
            }
            _ => {
                self.draft = DrawingState::Measurement { start: at };
                log::debug!("Measurement: started at ({:.1}, {:.1})", at.x, at.y);
                ToolOutcome::Drafting
            }
        }
    }

    fn handle_polygon(&mut self, input: ToolInput, ctx: &ToolContext<'_>) -> ToolOutcome {
        match input {
            ToolInput::Click(at) => {
                match &mut self.draft {
                    DrawingState::Polygon { vertices } => {
                        vertices.push(at);
                        log::debug!(
                            "Polygon: added vertex {} at ({:.1}, {:.1})",
                            vertices.len(),
                            at.x,
                            at.y
                        );
                    }
                    _ => {
                        self.draft = DrawingState::Polygon { vertices: vec![at] };
                        log::debug!("Polygon: started at ({:.1}, {:.1})", at.x, at.y);
                    }
                }
                ToolOutcome::Drafting
            }
            ToolInput::Close(_) => {
                let DrawingState::Polygon { vertices } = &self.draft else {
                    return ToolOutcome::Ignored;
                };
                match Annotation::polygon(vertices.clone(), ctx.calibration, ctx.color) {
                    Some(annotation) => {
                        log::debug!(
                            "Polygon: closed with {} vertices, {}",
                            vertices.len(),
                            annotation.label
                        );
                        self.draft = DrawingState::Idle;
                        ToolOutcome::Commit(annotation)
                    }
                    None => {
                        log::debug!(
                            "Polygon: close ignored with only {} vertices",
                            vertices.len()
                        );
                        ToolOutcome::Ignored
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AnnotationShape;

    fn ctx() -> ToolContext<'static> {
        ToolContext {
            annotation_count: 0,
            calibration: None,
            color: PaletteColor::Red,
        }
    }

    fn click(x: f64, y: f64) -> ToolInput {
        ToolInput::Click(Point::new(x, y))
    }

    fn close() -> ToolInput {
        ToolInput::Close(Point::default())
    }

    #[test]
    fn test_select_is_pass_through() {
        let mut state = ToolState::new();
        assert_eq!(state.handle(click(1.0, 1.0), &ctx()), ToolOutcome::Ignored);
        assert_eq!(state.handle(close(), &ctx()), ToolOutcome::Ignored);
        assert!(!state.draft().is_drawing());
    }

    #[test]
    fn test_point_numbering_uses_store_count() {
        let mut state = ToolState::new();
        state.set_tool(AnnotationTool::Point);
        let ctx = ToolContext {
            annotation_count: 4,
            ..ctx()
        };
        match state.handle(click(5.0, 6.0), &ctx) {
            ToolOutcome::Commit(ann) => {
                assert_eq!(ann.label, "Point 5");
                assert_eq!(ann.shape, AnnotationShape::Point { at: Point::new(5.0, 6.0) });
            }
            other => panic!("Expected commit, got {:?}", other),
        }
        assert!(!state.draft().is_drawing());
    }

    #[test]
    fn test_measurement_two_clicks() {
        let mut state = ToolState::new();
        state.set_tool(AnnotationTool::Measurement);
        assert_eq!(state.handle(click(0.0, 0.0), &ctx()), ToolOutcome::Drafting);
        assert_eq!(
            state.draft(),
            &DrawingState::Measurement {
                start: Point::new(0.0, 0.0)
            }
        );

        let calibration = Calibration::new(2.0);
        let ctx = ToolContext {
            calibration: Some(&calibration),
            ..ctx()
        };
        match state.handle(click(3.0, 4.0), &ctx) {
            ToolOutcome::Commit(ann) => assert_eq!(ann.label, "10.00 m"),
            other => panic!("Expected commit, got {:?}", other),
        }
        assert_eq!(state.draft(), &DrawingState::Idle);
    }

    #[test]
    fn test_polygon_close_with_three_vertices() {
        let mut state = ToolState::new();
        state.set_tool(AnnotationTool::Polygon);
        state.handle(click(0.0, 0.0), &ctx());
        state.handle(click(10.0, 0.0), &ctx());
        state.handle(click(10.0, 10.0), &ctx());
        match state.handle(close(), &ctx()) {
            ToolOutcome::Commit(ann) => match ann.shape {
                AnnotationShape::Polygon {
                    vertices,
                    area_pixels,
                    ..
                } => {
                    assert_eq!(vertices.len(), 3);
                    assert!((area_pixels - 50.0).abs() < 1e-9);
                }
                other => panic!("Expected polygon, got {:?}", other),
            },
            other => panic!("Expected commit, got {:?}", other),
        }
        assert!(!state.draft().is_drawing());
    }

    #[test]
    fn test_polygon_short_close_keeps_draft() {
        let mut state = ToolState::new();
        state.set_tool(AnnotationTool::Polygon);
        state.handle(click(0.0, 0.0), &ctx());
        state.handle(click(10.0, 0.0), &ctx());
        assert_eq!(state.handle(close(), &ctx()), ToolOutcome::Ignored);

        let DrawingState::Polygon { vertices } = state.draft() else {
            panic!("Expected polygon draft");
        };
        assert_eq!(vertices.len(), 2);

        assert_eq!(state.handle(click(10.0, 10.0), &ctx()), ToolOutcome::Drafting);
        assert!(matches!(state.handle(close(), &ctx()), ToolOutcome::Commit(_)));
    }

    #[test]
    fn test_close_without_draft_is_ignored() {
        let mut state = ToolState::new();
        state.set_tool(AnnotationTool::Polygon);
        assert_eq!(state.handle(close(), &ctx()), ToolOutcome::Ignored);
        assert!(!state.draft().is_drawing());
    }

    #[test]
    fn test_cancel_keeps_tool() {
        let mut state = ToolState::new();
        state.set_tool(AnnotationTool::Measurement);
        assert!(!state.cancel());
        state.handle(click(0.0, 0.0), &ctx());
        assert!(state.cancel());
        assert_eq!(state.tool(), AnnotationTool::Measurement);
        assert!(!state.draft().is_drawing());

        // Next click seeds a new start rather than ending a measurement
        assert_eq!(state.handle(click(5.0, 5.0), &ctx()), ToolOutcome::Drafting);
        assert_eq!(
            state.draft(),
            &DrawingState::Measurement {
                start: Point::new(5.0, 5.0)
            }
        );
    }

    #[test]
    fn test_tool_switch_discards_draft() {
        let mut state = ToolState::new();
        state.set_tool(AnnotationTool::Polygon);
        state.handle(click(0.0, 0.0), &ctx());
        state.handle(click(10.0, 0.0), &ctx());
        assert!(state.set_tool(AnnotationTool::Select));
        assert!(!state.draft().is_drawing());
        assert!(!state.set_tool(AnnotationTool::Polygon));
    }

    #[test]
    fn test_eraser_reports_click_position() {
        let mut state = ToolState::new();
        state.set_tool(AnnotationTool::Eraser);
        assert_eq!(
            state.handle(click(7.0, 8.0), &ctx()),
            ToolOutcome::Erase(Point::new(7.0, 8.0))
        );
        assert_eq!(state.handle(close(), &ctx()), ToolOutcome::Ignored);
    }
}
