//! Instruction text sent alongside images.

pub const MODEL_PHOTO: &str = "Act as a fashion photographer. Turn the person in this photo into a \
full-body catalogue model shot. Use a plain studio backdrop in light gray (#f0f0f0) and a calm, \
neutral expression. Keep the person's identity, features and build, and stand them in a relaxed \
model stance. The result must be photorealistic and exactly square (1:1). Respond with the image only.";

pub const APPLY_GARMENTS: &str = "Act as a virtual fitting room. The first image shows a model; \
every following image shows one garment. Produce a photorealistic image of the same model wearing \
all of the garments together as one outfit.

Rules:
1. Layer the garments sensibly, e.g. a shirt goes under a jacket.
2. Fully replace whatever the model wore in the garments' place; none of it may show through.
3. Keep the face, hair, body, stance and background exactly as they are.
4. Fit the clothes naturally, with folds, shadows and lighting that match the scene.
5. The output must be square (1:1).
6. Respond with the edited image only, no text.";

pub const REMOVE_BACKGROUND: &str = "Isolate the main subject of this image (a garment or a person) \
and return it on a fully transparent background as a PNG. Respond with the image only.";

/// Instruction for re-rendering an image from another camera angle.
pub fn change_pose(pose_instruction: &str) -> String {
    format!(
        "Act as a fashion photographer. Re-shoot this image from a different angle while keeping \
         the person, the clothing and the backdrop identical. New angle: \"{}\". The output must be \
         square (1:1). Respond with the image only.",
        pose_instruction
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_pose_embeds_instruction() {
        let prompt = change_pose("Side profile view");
        assert!(prompt.contains("\"Side profile view\""));
    }
}
