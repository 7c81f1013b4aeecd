// SPDX-License-Identifier: MIT

//! The five reference workflows
//!
//! Each module declares its worker ids, state schema, route table and
//! workers, and exposes a `builder` that assembles them into a
//! [`GraphBuilder`](crate::relay::workflow::builder::GraphBuilder).

/// Declare a closed set of worker ids with their transcript names
macro_rules! worker_ids {
    ($(#[$meta:meta])* $vis:vis enum $name:ident { $($variant:ident => $label:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $($variant),+
        }

        impl $crate::relay::workflow::graph::WorkerId for $name {
            fn all() -> &'static [Self] {
                &[$($name::$variant),+]
            }

            fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str($crate::relay::workflow::graph::WorkerId::as_str(self))
            }
        }
    };
}

pub mod compliance;
pub mod credit;
pub mod financial;
pub mod fraud;
pub mod portfolio;

/// `1250000` → `1,250,000`
pub(crate) fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// `12345.5` → `$12,345.50`
pub(crate) fn format_money(amount: f64) -> String {
    let sign = if amount < 0.0 { "-" } else { "" };
    let cents = (amount.abs() * 100.0).round() as u64;
    format!("{}${}.{:02}", sign, group_thousands(cents / 100), cents % 100)
}

/// Round to four decimal places to keep weighted sums readable
pub(crate) fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(1_250_000), "1,250,000");
    }

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(12345.5), "$12,345.50");
        assert_eq!(format_money(0.0), "$0.00");
        assert_eq!(format_money(-42.129), "-$42.13");
    }

    #[test]
    fn test_round4() {
        assert_eq!(round4(0.4 * 0.3 + 0.3 * 0.1 + 0.3 * 0.2), 0.21);
    }
}
