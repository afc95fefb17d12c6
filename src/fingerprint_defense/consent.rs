//! Consent gate for canvas pixel extraction.
//!
//! The first extraction in a page's lifetime asks the user once; the answer
//! is kept for every later extraction. When the answer is no, or no answer
//! can be obtained, extraction runs against a blank canvas of the same size
//! so the result keeps the exact encoding of a real extraction.

use std::cell::Cell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use super::capability::{CanvasSource, ConsentPrompt};
use crate::error::Result;

/// Session-scoped consent decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConsentState {
    Unset,
    Granted,
    Denied,
}

/// Owns the consent decision for one page.
pub struct ConsentGate {
    state: Cell<ConsentState>,
    prompt: Rc<dyn ConsentPrompt>,
    message: String,
}

impl ConsentGate {
    pub fn new(prompt: Rc<dyn ConsentPrompt>, message: impl Into<String>) -> Self {
        Self {
            state: Cell::new(ConsentState::Unset),
            prompt,
            message: message.into(),
        }
    }

    pub fn state(&self) -> ConsentState {
        self.state.get()
    }

    /// Resolve the decision, prompting only while it is unset.
    ///
    /// A prompt failure counts as a denial.
    pub fn decide(&self) -> ConsentState {
        if self.state.get() != ConsentState::Unset {
            return self.state.get();
        }

        let decision = match self.prompt.confirm(&self.message) {
            Ok(true) => ConsentState::Granted,
            Ok(false) => ConsentState::Denied,
            Err(e) => {
                log::warn!("Canvas consent prompt failed, denying extraction: {}", e);
                ConsentState::Denied
            }
        };
        log::info!("Canvas extraction consent: {:?}", decision);
        self.state.set(decision);
        decision
    }

    /// The canvas an extraction should read: the real one when granted,
    /// otherwise a fresh blank canvas with identical dimensions.
    ///
    /// A receiver that is not a canvas fails before the user is asked.
    pub fn select<O: Clone>(&self, canvas: &O, source: &dyn CanvasSource<O>) -> Result<O> {
        let (width, height) = source.dimensions(canvas)?;
        match self.decide() {
            ConsentState::Granted => Ok(canvas.clone()),
            ConsentState::Denied | ConsentState::Unset => source.create_blank(width, height),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResistError;
    use std::cell::RefCell;

    struct ScriptedPrompt {
        answer: Result<bool>,
        asked: Cell<u32>,
    }

    impl ConsentPrompt for ScriptedPrompt {
        fn confirm(&self, _message: &str) -> Result<bool> {
            self.asked.set(self.asked.get() + 1);
            self.answer.clone()
        }
    }

    /// Canvases are (id, width, height); blanks get id 0. Id `u32::MAX`
    /// stands for a receiver that is not a canvas.
    struct Canvases {
        created: RefCell<Vec<(u32, u32)>>,
    }

    impl CanvasSource<(u32, u32, u32)> for Canvases {
        fn dimensions(&self, canvas: &(u32, u32, u32)) -> Result<(u32, u32)> {
            if canvas.0 == u32::MAX {
                return Err(ResistError::Host("receiver is not a canvas".into()));
            }
            Ok((canvas.1, canvas.2))
        }

        fn create_blank(&self, width: u32, height: u32) -> Result<(u32, u32, u32)> {
            self.created.borrow_mut().push((width, height));
            Ok((0, width, height))
        }
    }

    fn gate(answer: Result<bool>) -> (ConsentGate, Rc<ScriptedPrompt>) {
        let prompt = Rc::new(ScriptedPrompt {
            answer,
            asked: Cell::new(0),
        });
        (ConsentGate::new(prompt.clone(), "allow?"), prompt)
    }

    #[test]
    fn test_prompts_exactly_once() {
        let (gate, prompt) = gate(Ok(true));
        assert_eq!(gate.state(), ConsentState::Unset);
        for _ in 0..10 {
            assert_eq!(gate.decide(), ConsentState::Granted);
        }
        assert_eq!(prompt.asked.get(), 1);
    }

    #[test]
    fn test_granted_uses_real_canvas() {
        let (gate, _) = gate(Ok(true));
        let canvases = Canvases {
            created: RefCell::new(Vec::new()),
        };
        assert_eq!(gate.select(&(7, 10, 20), &canvases).unwrap(), (7, 10, 20));
        assert!(canvases.created.borrow().is_empty());
    }

    #[test]
    fn test_denied_uses_blank_of_same_size() {
        let (gate, prompt) = gate(Ok(false));
        let canvases = Canvases {
            created: RefCell::new(Vec::new()),
        };
        assert_eq!(gate.select(&(7, 10, 20), &canvases).unwrap(), (0, 10, 20));
        assert_eq!(gate.select(&(8, 3, 4), &canvases).unwrap(), (0, 3, 4));
        assert_eq!(*canvases.created.borrow(), vec![(10, 20), (3, 4)]);
        assert_eq!(prompt.asked.get(), 1);
    }

    #[test]
    fn test_non_canvas_receiver_does_not_prompt() {
        let (gate, prompt) = gate(Ok(true));
        let canvases = Canvases {
            created: RefCell::new(Vec::new()),
        };
        assert!(gate.select(&(u32::MAX, 0, 0), &canvases).is_err());
        assert_eq!(prompt.asked.get(), 0);
        assert_eq!(gate.state(), ConsentState::Unset);

        assert_eq!(gate.select(&(5, 2, 2), &canvases).unwrap(), (5, 2, 2));
        assert_eq!(prompt.asked.get(), 1);
    }

    #[test]
    fn test_prompt_failure_denies() {
        let (gate, prompt) = gate(Err(ResistError::ConsentUnavailable("no window".into())));
        assert_eq!(gate.decide(), ConsentState::Denied);
        assert_eq!(gate.decide(), ConsentState::Denied);
        assert_eq!(prompt.asked.get(), 1);
    }
}
