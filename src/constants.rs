// Fixed strings and defaults. Anything overridable at runtime is read in config.rs.

use serde::Serialize;

/// Environment variable holding the inference service token.
pub const API_KEY_VAR: &str = "HF_API_KEY";

pub const DEFAULT_INFERENCE_URL: &str = "https://router.huggingface.co/hf-inference/models";
pub const DEFAULT_CHAT_MODEL: &str = "microsoft/Phi-3-mini-4k-instruct";
pub const DEFAULT_MAX_TOKENS: u32 = 500;
pub const DEFAULT_PORT: u16 = 9900;

/// Persona prepended verbatim to every prompt unless ASHLEY_PERSONA_FILE replaces it.
pub const SYSTEM_PROMPT_GENERAL: &str = include_str!("../prompts/ashley.txt");

/// Sent instead of a generated answer when a message carries files.
pub const ATTACHMENT_REPLY: &str = "I'm still in a developing phase, but I'd like to have the ability to process \
and analyze images, videos, and other file types in the future. For now, \
I'm best suited for text-based conversations about mental health and well-being. \
Is there a particular topic in that area you'd like to discuss?";

/// Shown to the user when generation fails; the underlying error is only logged.
pub const GENERATION_FAILED_NOTICE: &str =
    "Sorry, I couldn't finish that reply. Please try again in a moment.";

/// A suggested opening message shown before the conversation starts.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct Starter {
    pub label: &'static str,
    pub message: &'static str,
    pub icon: &'static str,
}

pub const STARTERS: [Starter; 4] = [
    Starter {
        label: "Morning motivation boost",
        message: "I'm feeling stuck and unmotivated this morning. Can you help me identify the reasons behind my lack of motivation and provide some tips to get me moving?",
        icon: "/public/coffee-cup.svg",
    },
    Starter {
        label: "Stress management techniques",
        message: "I'm feeling overwhelmed with stress and anxiety. Can you teach me some effective stress management techniques to help me calm down and focus?",
        icon: "/public/sneakers.svg",
    },
    Starter {
        label: "Goal setting for mental well-being",
        message: "I want to prioritize my mental well-being, but I'm not sure where to start. Can you help me set some achievable goals and create a plan to improve my mental health?",
        icon: "/public/meditation.svg",
    },
    Starter {
        label: "Building self-care habits",
        message: "I know self-care is important, but I struggle to make it a priority. Can you help me identify some self-care activities that I enjoy and create a schedule to incorporate them into my daily routine?",
        icon: "/public/idol.svg",
    },
];
