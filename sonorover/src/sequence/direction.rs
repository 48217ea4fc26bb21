use serde::{Deserialize, Serialize};

use sonorover_core::geometry::Vector3;

use crate::error::SequenceError;

/// Cartesian axis of the positioning system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    /// X axis.
    X,
    /// Y axis.
    Y,
    /// Z axis.
    Z,
}

impl Axis {
    /// Component index in a coordinate.
    #[must_use]
    pub const fn index(&self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    /// Lowercase name.
    #[must_use]
    pub const fn name(&self) -> char {
        match self {
            Axis::X => 'x',
            Axis::Y => 'y',
            Axis::Z => 'z',
        }
    }
}

/// Measuring direction such as `+x` or `-z`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Direction {
    /// Axis of the direction.
    pub axis: Axis,
    /// `true` for the negative direction.
    pub negative: bool,
}

impl Direction {
    /// Unit vector of this direction.
    #[must_use]
    pub fn unit(&self) -> Vector3 {
        let mut v = Vector3::zeros();
        v[self.axis.index()] = if self.negative { -1.0 } else { 1.0 };
        v
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}{}",
            if self.negative { '-' } else { '+' },
            self.axis.name()
        )
    }
}

impl std::str::FromStr for Direction {
    type Err = SequenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.trim().chars();
        let negative = match chars.next() {
            Some('+') => false,
            Some('-') => true,
            _ => return Err(SequenceError::InvalidDirection(s.to_string())),
        };
        let axis = match (chars.next().map(|c| c.to_ascii_lowercase()), chars.next()) {
            (Some('x'), None) => Axis::X,
            (Some('y'), None) => Axis::Y,
            (Some('z'), None) => Axis::Z,
            _ => return Err(SequenceError::InvalidDirection(s.to_string())),
        };
        Ok(Self { axis, negative })
    }
}

impl TryFrom<String> for Direction {
    type Error = SequenceError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Direction> for String {
    fn from(d: Direction) -> Self {
        d.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[rstest::rstest]
    #[case(Ok(Direction { axis: Axis::X, negative: false }), "+x")]
    #[case(Ok(Direction { axis: Axis::Y, negative: true }), "-y")]
    #[case(Ok(Direction { axis: Axis::Z, negative: false }), " +Z ")]
    #[case(Err(SequenceError::InvalidDirection("x".to_string())), "x")]
    #[case(Err(SequenceError::InvalidDirection("+w".to_string())), "+w")]
    #[case(Err(SequenceError::InvalidDirection("+xy".to_string())), "+xy")]
    #[case(Err(SequenceError::InvalidDirection("".to_string())), "")]
    #[test]
    fn parse(#[case] expect: Result<Direction, SequenceError>, #[case] s: &str) {
        assert_eq!(expect, s.parse());
    }

    #[rstest::rstest]
    #[case(Vector3::new(-1., 0., 0.), "-x")]
    #[case(Vector3::new(0., 1., 0.), "+y")]
    #[case(Vector3::new(0., 0., -1.), "-z")]
    #[test]
    fn unit(#[case] expect: Vector3, #[case] s: &str) -> anyhow::Result<()> {
        let d: Direction = s.parse()?;
        assert_eq!(expect, d.unit());
        assert_eq!(s, d.to_string());
        Ok(())
    }
}
