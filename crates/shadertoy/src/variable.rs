use glam::{Vec3, Vec4};

/// How a tunable is interpreted by editors and by the shader wrapper.
///
/// `Direction` and `Color` are both three-component; the tag only changes how
/// a UI presents the value (unit vector widget vs. color picker) and is
/// preserved through save/load. `Scalar` is single-component with an optional
/// edit range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VariableKind {
    Scalar,
    Direction,
    Color,
}

impl VariableKind {
    pub fn component_count(self) -> usize {
        match self {
            VariableKind::Scalar => 1,
            VariableKind::Direction | VariableKind::Color => 3,
        }
    }
}

/// A live-editable shader parameter declared by an `@var` directive.
///
/// `value` tracks edits and settings-file overrides; `initial` always holds
/// the declaration from the shader source so a reset can return to it.
/// Scalars store their number in `value.x`. `min`/`max`/`increment` are only
/// meaningful for scalars and stay zero when the declaration omits them, in
/// which case edits are unclamped.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShaderVariable {
    pub kind: VariableKind,
    pub value: Vec3,
    pub initial: Vec3,
    pub min: f32,
    pub max: f32,
    pub increment: f32,
}

impl ShaderVariable {
    pub fn scalar(value: f32, min: f32, max: f32, increment: f32) -> Self {
        Self {
            kind: VariableKind::Scalar,
            value: Vec3::new(value, 0.0, 0.0),
            initial: Vec3::new(value, 0.0, 0.0),
            min,
            max,
            increment,
        }
    }

    pub fn vector(kind: VariableKind, value: Vec3) -> Self {
        debug_assert_ne!(kind, VariableKind::Scalar);
        Self {
            kind,
            value,
            initial: value,
            min: 0.0,
            max: 0.0,
            increment: 0.0,
        }
    }

    pub fn scalar_value(&self) -> f32 {
        self.value.x
    }

    /// True when the declaration carried a usable edit range.
    pub fn has_range(&self) -> bool {
        self.min < self.max
    }

    /// Nudges the value by `steps` increments, clamped to the range when one
    /// exists. Vector kinds shift all three components uniformly by a small
    /// fixed step.
    pub fn nudge(&mut self, steps: f32) {
        match self.kind {
            VariableKind::Scalar => {
                let step = if self.increment != 0.0 {
                    self.increment
                } else {
                    0.01
                };
                let mut next = self.value.x + step * steps;
                if self.has_range() {
                    next = next.clamp(self.min, self.max);
                }
                self.value.x = next;
            }
            VariableKind::Direction | VariableKind::Color => {
                self.value += Vec3::splat(0.01 * steps);
            }
        }
    }

    pub fn reset(&mut self) {
        self.value = self.initial;
    }

    /// Uniform-slot form consumed by the renderer; unused lanes stay zero.
    pub fn as_uniform(&self) -> Vec4 {
        self.value.extend(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_keeps_value_in_x() {
        let var = ShaderVariable::scalar(0.5, 0.0, 1.0, 0.01);
        assert_eq!(var.scalar_value(), 0.5);
        assert_eq!(var.kind.component_count(), 1);
    }

    #[test]
    fn nudge_respects_the_range() {
        let mut var = ShaderVariable::scalar(0.95, 0.0, 1.0, 0.1);
        var.nudge(2.0);
        assert_eq!(var.scalar_value(), 1.0);
        var.nudge(-30.0);
        assert_eq!(var.scalar_value(), 0.0);
    }

    #[test]
    fn nudge_without_range_is_unclamped() {
        let mut var = ShaderVariable::scalar(0.0, 0.0, 0.0, 0.5);
        var.nudge(10.0);
        assert!((var.scalar_value() - 5.0).abs() < 1e-6);
    }

    #[test]
    fn reset_restores_the_declared_value() {
        let mut var = ShaderVariable::vector(VariableKind::Color, Vec3::new(0.2, 0.4, 0.6));
        var.value = Vec3::splat(9.0);
        var.reset();
        assert_eq!(var.value, Vec3::new(0.2, 0.4, 0.6));
    }
}
