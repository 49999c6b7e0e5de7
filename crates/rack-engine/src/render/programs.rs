//! Program table and the bound-program state machine.
//!
//! Each known program is one row: which state it puts the executor in and
//! the fixed pipeline state it needs. A program switch applies the row's
//! effects; consecutive draws of the same program apply nothing.

use rack_proto::ProgramId;

/// Fixed-function blending.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BlendMode {
    /// Source replaces destination.
    Opaque,
    /// `src * src_alpha + dst * (1 - src_alpha)`.
    Alpha,
}

/// Which program the executor last bound.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum ProgramState {
    #[default]
    NoProgramBound,
    ColorBound,
    FontBound,
}

/// One row of [`PROGRAMS`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ProgramEffects {
    pub program: ProgramId,
    pub state: ProgramState,
    pub blend: BlendMode,
    /// Needs the font atlas bound.
    pub atlas: bool,
    /// Reads the packed texcoord attribute.
    pub textured: bool,
}

pub const PROGRAMS: [ProgramEffects; 2] = [
    ProgramEffects {
        program: ProgramId::FLAT,
        state: ProgramState::ColorBound,
        blend: BlendMode::Opaque,
        atlas: false,
        textured: false,
    },
    ProgramEffects {
        program: ProgramId::MSDF_TEXT,
        state: ProgramState::FontBound,
        blend: BlendMode::Alpha,
        atlas: true,
        textured: true,
    },
];

/// Table row for `program`, if the renderer knows it.
pub fn effects_of(program: ProgramId) -> Option<&'static ProgramEffects> {
    PROGRAMS.iter().find(|e| e.program == program)
}

impl ProgramState {
    /// Effects to apply when moving from `self` to `next`'s program, or
    /// `None` when it is already bound.
    pub fn transition(self, next: &'static ProgramEffects) -> Option<&'static ProgramEffects> {
        (self != next.state).then_some(next)
    }

    pub fn program(self) -> Option<ProgramId> {
        PROGRAMS.iter().find(|e| e.state == self).map(|e| e.program)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_rows() {
        let flat = effects_of(ProgramId::FLAT).unwrap();
        assert_eq!(flat.blend, BlendMode::Opaque);
        assert!(!flat.atlas);

        let text = effects_of(ProgramId::MSDF_TEXT).unwrap();
        assert_eq!(text.blend, BlendMode::Alpha);
        assert!(text.atlas && text.textured);

        assert!(effects_of(ProgramId(2)).is_none());
        assert!(effects_of(ProgramId(u32::MAX)).is_none());
    }

    #[test]
    fn same_program_is_no_transition() {
        let text = effects_of(ProgramId::MSDF_TEXT).unwrap();
        assert_eq!(ProgramState::NoProgramBound.transition(text), Some(text));
        assert_eq!(ProgramState::FontBound.transition(text), None);
        assert_eq!(ProgramState::ColorBound.transition(text), Some(text));
    }

    #[test]
    fn state_maps_back_to_program() {
        assert_eq!(ProgramState::ColorBound.program(), Some(ProgramId::FLAT));
        assert_eq!(ProgramState::NoProgramBound.program(), None);
    }
}
