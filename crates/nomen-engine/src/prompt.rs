use nomen_contracts::input::{AnalysisMode, Persona, UserInput};

pub const BACKGROUND_PLACEHOLDER: &str = "Not specified";

/// Appended to every `visualPrompt` before the image call.
pub const IMAGE_STYLE_SUFFIX: &str =
    "ink wash painting style, neo-oriental, sumi-e brushwork, \
     generous negative space, minimal, masterpiece";

const DEEP_INSTRUCTION: &str = "\
You are \"Nomen (名·相)\", ferryman of souls.
Philosophy: Cognition (limitation), Dialectic (weapon), Ascension (choice).
Take the name apart as a case study: imagery decomposition \
(literal reading, five-element energy, metaphor), \
a personality portrait (self-perception, social strategy, mindset) and a fortune projection \
(wealth, relationships, hidden worries).
Lay out three decision points for the coming years in chronological order \
and give one kanji as an energy totem.
Speak plainly, like a sharp friend rather than a fortune teller.
Output: JSON.
Language: Chinese (Simplified).";

const SAGE_INSTRUCTION: &str = "\
You are Nomen, a hermit sage versed in the I Ching and semiotics.
Read the name through hexagram imagery and classical allusion; speak in terse, oracular judgements.
Output: JSON.
Language: Chinese (Simplified).";

const PSYCHOLOGIST_INSTRUCTION: &str = "\
You are Nomen, a counselling psychologist who studies what names do to the people who carry them.
Be warm and healing; name the inner tension gently and offer grounded reassurance.
Output: JSON.
Language: Chinese (Simplified).";

const MENTOR_INSTRUCTION: &str = "\
You are Nomen, a sharp-tongued career mentor.
Read the name against the realities of work and ambition; \
be blunt, practical and a little merciless.
Output: JSON.
Language: Chinese (Simplified).";

const STANDARD_FALLBACK_INSTRUCTION: &str = "\
You are Nomen. Expert in semiotics.
Output: JSON.
Language: Chinese (Simplified).";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptBundle {
    pub prompt: String,
    pub system_instruction: &'static str,
}

pub fn build_prompt(input: &UserInput, mode: AnalysisMode) -> PromptBundle {
    PromptBundle {
        prompt: user_prompt(input),
        system_instruction: system_instruction(mode, input.persona),
    }
}

pub fn user_prompt(input: &UserInput) -> String {
    format!(
        "Analyze this user:\nName: {}\nOccupation: {}\nBackground: {}\nLocation: {}\n",
        input.name.trim(),
        input.occupation.trim(),
        input.background().unwrap_or(BACKGROUND_PLACEHOLDER),
        input.location.trim(),
    )
}

pub fn system_instruction(mode: AnalysisMode, persona: Persona) -> &'static str {
    match mode {
        AnalysisMode::Deep => DEEP_INSTRUCTION,
        AnalysisMode::Standard => match persona {
            Persona::Sage => SAGE_INSTRUCTION,
            Persona::Psychologist => PSYCHOLOGIST_INSTRUCTION,
            Persona::Mentor => MENTOR_INSTRUCTION,
            Persona::Colloquial => STANDARD_FALLBACK_INSTRUCTION,
        },
    }
}

pub fn image_prompt(visual_prompt: &str) -> String {
    let trimmed = visual_prompt.trim();
    if trimmed.is_empty() {
        return IMAGE_STYLE_SUFFIX.to_string();
    }
    format!("{trimmed}, {IMAGE_STYLE_SUFFIX}")
}
