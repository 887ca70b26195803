use std::fmt::Display;

use tracing::warn;

/// Order of a stochastic Runge-Kutta integrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Order {
    Three,
    Five,
}

/// Coefficient profile of a Runge-Kutta integrator.
///
/// Only order 5 `High` uses a published tableau. The other profiles use derived substitute
/// coefficients, see `methods::runge_kutta::is_derived`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Profile {
    Low,
    Mid,
    High,
}

/// The simulation method a trial runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    /// Exact stochastic simulation, reported at hurdle checkpoints
    Direct,
    /// Fixed-step Poisson leaping
    TauLeap,
    /// Multi-stage leaping with a single noise draw per step
    RungeKutta(Order, Profile),
    /// Deterministic mean-field trapezoidal integrator
    Heun,
}

impl Algorithm {
    pub const ALL: [Algorithm; 9] = [
        Algorithm::Direct,
        Algorithm::TauLeap,
        Algorithm::RungeKutta(Order::Three, Profile::Low),
        Algorithm::RungeKutta(Order::Three, Profile::Mid),
        Algorithm::RungeKutta(Order::Three, Profile::High),
        Algorithm::RungeKutta(Order::Five, Profile::Low),
        Algorithm::RungeKutta(Order::Five, Profile::Mid),
        Algorithm::RungeKutta(Order::Five, Profile::High),
        Algorithm::Heun,
    ];

    /// Looks an algorithm up by name.
    ///
    /// Accepts the long names (`tau-leap`, `rk5-high`, ...) as well as the short command line
    /// forms (`tleap`, `nrk5h`, ...). Anything unrecognised falls back to the direct method.
    pub fn from_name(name: &str) -> Self {
        let name = name.trim().to_ascii_lowercase();
        let algorithm = match name.as_str() {
            "direct" => Some(Algorithm::Direct),
            "tau-leap" | "tleap" => Some(Algorithm::TauLeap),
            "heun" => Some(Algorithm::Heun),
            "rk3-low" | "nrk3l" => Some(Algorithm::RungeKutta(Order::Three, Profile::Low)),
            "rk3-mid" | "nrk3m" => Some(Algorithm::RungeKutta(Order::Three, Profile::Mid)),
            "rk3-high" | "nrk3h" => Some(Algorithm::RungeKutta(Order::Three, Profile::High)),
            "rk5-low" | "nrk5l" => Some(Algorithm::RungeKutta(Order::Five, Profile::Low)),
            "rk5-mid" | "nrk5m" => Some(Algorithm::RungeKutta(Order::Five, Profile::Mid)),
            "rk5-high" | "nrk5h" => Some(Algorithm::RungeKutta(Order::Five, Profile::High)),
            _ => None,
        };

        algorithm.unwrap_or_else(|| {
            warn!(name = %name, "unrecognised algorithm, falling back to the direct method");
            Algorithm::Direct
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::Direct => "direct",
            Algorithm::TauLeap => "tau-leap",
            Algorithm::Heun => "heun",
            Algorithm::RungeKutta(Order::Three, Profile::Low) => "rk3-low",
            Algorithm::RungeKutta(Order::Three, Profile::Mid) => "rk3-mid",
            Algorithm::RungeKutta(Order::Three, Profile::High) => "rk3-high",
            Algorithm::RungeKutta(Order::Five, Profile::Low) => "rk5-low",
            Algorithm::RungeKutta(Order::Five, Profile::Mid) => "rk5-mid",
            Algorithm::RungeKutta(Order::Five, Profile::High) => "rk5-high",
        }
    }

    /// Whether runs draw from the PRNG
    pub fn is_stochastic(&self) -> bool {
        !matches!(self, Algorithm::Heun)
    }
}

impl From<&str> for Algorithm {
    fn from(name: &str) -> Self {
        Algorithm::from_name(name)
    }
}

impl Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use tracing_test::traced_test;

    use super::*;

    #[test]
    fn names_round_trip() {
        for algorithm in Algorithm::ALL {
            assert_eq!(Algorithm::from_name(algorithm.name()), algorithm);
        }
    }

    #[test]
    fn short_names_are_accepted() {
        assert_eq!(Algorithm::from_name("tleap"), Algorithm::TauLeap);
        assert_eq!(Algorithm::from_name("nrk3m"), Algorithm::RungeKutta(Order::Three, Profile::Mid));
        assert_eq!(Algorithm::from("NRK5H"), Algorithm::RungeKutta(Order::Five, Profile::High));
    }

    #[test]
    #[traced_test]
    fn unknown_names_fall_back_to_direct() {
        assert_eq!(Algorithm::from_name("gillespie"), Algorithm::Direct);
        assert_eq!(Algorithm::from_name(""), Algorithm::Direct);
        assert!(logs_contain("gillespie"));
    }

    #[test]
    fn only_heun_is_deterministic() {
        let deterministic: Vec<_> = Algorithm::ALL.iter().filter(|a| !a.is_stochastic()).collect();
        assert_eq!(deterministic, vec![&Algorithm::Heun]);
    }
}
