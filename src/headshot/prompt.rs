use crate::headshot::styles::{BackgroundStyle, SuitStyle};

pub const IDENTITY_CLAUSE: &str = "CRITICAL: Keep the person's exact facial features, hair structure, and identity identical to the original.";

pub fn build_headshot_prompt(suit: SuitStyle, background: BackgroundStyle) -> String {
    format!(
        "Transform this person's photo into a professional studio headshot for a resume.\n\
         The person should be wearing {suit}.\n\
         The background should be {background}.\n\
         {IDENTITY_CLAUSE}\n\
         Improve the grooming, align the posture to be professional, and ensure the lighting is high-end studio quality.\n\
         The output must look like a high-resolution professional photography session.",
        suit = suit.description(),
        background = background.description(),
    )
}
