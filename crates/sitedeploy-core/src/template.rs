//! Embedded infrastructure templates, one per phase.

use crate::stack::Phase;

const PHASE1: &str = include_str!("../templates/phase1.yaml");
const PHASE2: &str = include_str!("../templates/phase2.yaml");

pub fn body(phase: Phase) -> &'static str {
    match phase {
        Phase::One => PHASE1,
        Phase::Two => PHASE2,
    }
}
