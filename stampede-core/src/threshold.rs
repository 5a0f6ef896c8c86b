use crate::{ConfigError, Stat};
use std::fmt;
use std::str::FromStr;

/// A pass/fail criterion on one statistic of a metric, written as `<stat><op><value>`, e.g.
/// `p(95)<500` or `rate>0.99`.
#[derive(Clone, Debug, PartialEq)]
pub struct Threshold {
    pub stat: Stat,
    pub op: Comparison,
    pub bound: f64,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Comparison {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl Comparison {
    fn as_str(&self) -> &'static str {
        match self {
            Comparison::Lt => "<",
            Comparison::Le => "<=",
            Comparison::Gt => ">",
            Comparison::Ge => ">=",
            Comparison::Eq => "==",
            Comparison::Ne => "!=",
        }
    }
}

impl Threshold {
    pub fn holds(&self, observed: f64) -> bool {
        match self.op {
            Comparison::Lt => observed < self.bound,
            Comparison::Le => observed <= self.bound,
            Comparison::Gt => observed > self.bound,
            Comparison::Ge => observed >= self.bound,
            Comparison::Eq => observed == self.bound,
            Comparison::Ne => observed != self.bound,
        }
    }
}

impl FromStr for Threshold {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidThreshold(s.to_string());

        // NOTE: Two-character operators have to be tried first so `<=` is not read as `<`.
        const OPS: [(&str, Comparison); 6] = [
            ("<=", Comparison::Le),
            (">=", Comparison::Ge),
            ("==", Comparison::Eq),
            ("!=", Comparison::Ne),
            ("<", Comparison::Lt),
            (">", Comparison::Gt),
        ];

        let (idx, token, op) = OPS
            .iter()
            .filter_map(|(token, op)| s.find(token).map(|idx| (idx, *token, *op)))
            .min_by_key(|(idx, token, _)| (*idx, std::cmp::Reverse(token.len())))
            .ok_or_else(invalid)?;

        let stat = s[..idx].parse::<Stat>().map_err(|_| invalid())?;
        let bound = s[idx + token.len()..]
            .trim()
            .parse::<f64>()
            .map_err(|_| invalid())?;

        Ok(Self { stat, op, bound })
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.stat, self.op.as_str(), self.bound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_thresholds() {
        let t: Threshold = "p(95)<500".parse().unwrap();
        assert_eq!(t.stat, Stat::Percentile(95.));
        assert_eq!(t.op, Comparison::Lt);
        assert_eq!(t.bound, 500.);

        let t: Threshold = "rate >= 0.99".parse().unwrap();
        assert_eq!(t.stat, Stat::Rate);
        assert_eq!(t.op, Comparison::Ge);
        assert_eq!(t.bound, 0.99);

        let t: Threshold = "avg<=200".parse().unwrap();
        assert_eq!(t.op, Comparison::Le);
    }

    #[test]
    fn reject_malformed() {
        for s in ["p(95)", "p(95)<", "<500", "latency<5", "p(95)<fast"] {
            assert!(s.parse::<Threshold>().is_err(), "{s} should be rejected");
        }
    }

    #[test]
    fn evaluate() {
        let t: Threshold = "p(95)<500".parse().unwrap();
        assert!(t.holds(499.9));
        assert!(!t.holds(500.));

        let t: Threshold = "count!=0".parse().unwrap();
        assert!(t.holds(3.));
        assert!(!t.holds(0.));
    }

    #[test]
    fn display_round_trip() {
        for s in ["p(95)<500", "rate>0.99", "max<=1000", "count==10"] {
            assert_eq!(s.parse::<Threshold>().unwrap().to_string(), s);
        }
    }
}
