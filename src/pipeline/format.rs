//! Reply texts for the image description turn

use crate::vision::{AnalysisResult, Caption, DescriptionResult, Face};

/// Paragraph break that chat clients will not collapse
pub const LINE_SEPARATOR: &str = "\n\n\u{200C}";

pub const NO_IMAGE_PROMPT: &str = "Please send me an image and I'll describe it :)";
pub const DOWNLOADING: &str = "Downloading image...";
pub const PROCESSING: &str = "Image received, processing started...";
pub const NO_IDEA: &str = "Sorry, but I've no idea what it is :(";

const CAPTIONS_HEADER: &str = "#### My best guesses are:";
const FACES_HEADER: &str = "#### people on photo:";

/// `"{text} ({confidence:.2}%)"` per caption, paragraph separated
#[must_use]
pub fn format_captions(captions: &[Caption]) -> String {
    captions
        .iter()
        .map(|caption| format!("{} ({:.2}%)", caption.text, caption.confidence * 100.0))
        .collect::<Vec<_>>()
        .join(LINE_SEPARATOR)
}

/// `"{gender}, {age} at ({left}, {top})"` per face, paragraph separated
#[must_use]
pub fn format_faces(faces: &[Face]) -> String {
    faces
        .iter()
        .map(|face| {
            format!(
                "{}, {} at ({}, {})",
                face.gender, face.age, face.face_rectangle.left, face.face_rectangle.top
            )
        })
        .collect::<Vec<_>>()
        .join(LINE_SEPARATOR)
}

/// Reply for the describe result
#[must_use]
pub fn captions_reply(description: &DescriptionResult) -> String {
    let captions = format_captions(&description.captions);
    if captions.is_empty() {
        NO_IDEA.to_string()
    } else {
        format!("{CAPTIONS_HEADER}\n\n{captions}")
    }
}

/// Reply for the analyze result; `None` when no faces were found
#[must_use]
pub fn faces_reply(analysis: &AnalysisResult) -> Option<String> {
    let faces = analysis.faces();
    if faces.is_empty() {
        return None;
    }
    Some(format!("{FACES_HEADER}\n {}", format_faces(faces)))
}

/// Reply relayed to the user when a turn fails
#[must_use]
pub fn error_reply(error: &crate::Error) -> String {
    format!("Error occurred: {error}")
}
