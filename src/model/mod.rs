//! Data models for the annotation overlay.

mod annotation;
mod palette;

pub use annotation::{
    Annotation, AnnotationId, AnnotationKind, AnnotationShape, AnnotationTool, DrawingState,
    ImageId,
};
pub use palette::PaletteColor;
