use std::fmt;
use std::str::FromStr;

use crate::error::EditError;

/// One colour plane of an RGB image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Red,
    Green,
    Blue,
}

impl Channel {
    /// Index of the plane in blue-green-red order: red is 2, green 1, blue 0.
    pub fn index(self) -> usize {
        match self {
            Channel::Red => 2,
            Channel::Green => 1,
            Channel::Blue => 0,
        }
    }

    /// Offset of the plane inside an `Rgb<u8>` pixel.
    pub(crate) fn rgb_offset(self) -> usize {
        2 - self.index()
    }

    pub fn name(self) -> &'static str {
        match self {
            Channel::Red => "red",
            Channel::Green => "green",
            Channel::Blue => "blue",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Channel {
    type Err = EditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "red" => Ok(Channel::Red),
            "green" => Ok(Channel::Green),
            "blue" => Ok(Channel::Blue),
            _ => Err(EditError::UnknownChannel(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_indices_follow_bgr_layout() {
        assert_eq!(Channel::Red.index(), 2);
        assert_eq!(Channel::Green.index(), 1);
        assert_eq!(Channel::Blue.index(), 0);
    }

    #[test]
    fn test_rgb_offsets() {
        assert_eq!(Channel::Red.rgb_offset(), 0);
        assert_eq!(Channel::Green.rgb_offset(), 1);
        assert_eq!(Channel::Blue.rgb_offset(), 2);
    }

    #[test]
    fn test_parse_trims_whitespace() {
        assert_eq!(" Green ".parse::<Channel>().unwrap(), Channel::Green);
    }

    #[test]
    fn test_unknown_name_is_an_error() {
        for name in ["", "alpha", "r", "reds", "gray"] {
            match name.parse::<Channel>() {
                Err(EditError::UnknownChannel(got)) => assert_eq!(got, name),
                other => panic!("expected UnknownChannel for {:?}, got {:?}", name, other),
            }
        }
    }

    fn case_variants(word: &'static str) -> impl Strategy<Value = String> {
        proptest::collection::vec(any::<bool>(), word.len()).prop_map(move |upper| {
            word.chars()
                .zip(upper)
                .map(|(c, u)| if u { c.to_ascii_uppercase() } else { c })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn prop_red_any_case(name in case_variants("red")) {
            prop_assert_eq!(name.parse::<Channel>().unwrap().index(), 2);
        }

        #[test]
        fn prop_green_any_case(name in case_variants("green")) {
            prop_assert_eq!(name.parse::<Channel>().unwrap().index(), 1);
        }

        #[test]
        fn prop_blue_any_case(name in case_variants("blue")) {
            prop_assert_eq!(name.parse::<Channel>().unwrap().index(), 0);
        }
    }
}
