//! Conflict resolution for rows that share a primary key during a merge.

use std::fmt;
use std::sync::Arc;

use super::value::Value;

/// Custom combine function over the non-key values of two colliding rows.
///
/// Receives `(left, right)` and returns the non-key values of the merged row.
pub type AggregateFunction = Arc<dyn Fn(&[Value], &[Value]) -> Vec<Value> + Send + Sync>;

/// Strategy for combining two rows with identical keys.
///
/// "Left" and "right" follow chunk order: the right-hand row always comes
/// from a chunk positioned later in the distributed table.
#[derive(Clone, Default)]
pub enum Aggregate {
    /// The right-hand row replaces the left-hand row.
    #[default]
    LastWriteWins,
    /// The left-hand row is kept.
    FirstWriteWins,
    /// Custom combine function
    Custom(AggregateFunction),
}

impl Aggregate {
    /// Wrap a closure as a custom aggregate.
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&[Value], &[Value]) -> Vec<Value> + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(f))
    }

    /// Combine the non-key values of two colliding rows.
    pub fn combine(&self, left: &[Value], right: &[Value]) -> Vec<Value> {
        match self {
            Self::LastWriteWins => right.to_vec(),
            Self::FirstWriteWins => left.to_vec(),
            Self::Custom(f) => f(left, right),
        }
    }
}

impl fmt::Debug for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LastWriteWins => write!(f, "LastWriteWins"),
            Self::FirstWriteWins => write!(f, "FirstWriteWins"),
            Self::Custom(_) => write!(f, "Custom(<function>)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_strategies() {
        let left = vec![Value::Int(1)];
        let right = vec![Value::Int(2)];

        assert_eq!(Aggregate::default().combine(&left, &right), right);
        assert_eq!(Aggregate::FirstWriteWins.combine(&left, &right), left);
    }

    #[test]
    fn test_custom_strategy() {
        let sum = Aggregate::custom(|l, r| {
            l.iter()
                .zip(r)
                .map(|(a, b)| match (a, b) {
                    (Value::Int(a), Value::Int(b)) => Value::Int(a + b),
                    _ => b.clone(),
                })
                .collect()
        });

        let merged = sum.combine(&[Value::Int(3)], &[Value::Int(4)]);
        assert_eq!(merged, vec![Value::Int(7)]);
        assert_eq!(format!("{:?}", sum), "Custom(<function>)");
    }
}
