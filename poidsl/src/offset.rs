//! Relative locations, `"x,y,z"` in meters. Missing trailing components are 0.

use crate::parser::{ParseError, Result};
use nom::{
    character::complete::{char, space0},
    combinator::{eof, opt},
    number::complete::double,
    sequence::{delimited, preceded},
    Err::Error,
};

type Vector3 = na::Vector3<f64>;

pub fn parse_offset(s: &str) -> Result<&str, Vector3> {
    let (s, x) = delimited(space0, double, space0)(s)?;
    let (s, y) = opt(preceded(char(','), delimited(space0, double, space0)))(s)?;
    let (s, z) = opt(preceded(char(','), delimited(space0, double, space0)))(s)?;
    let (s, _) = eof(s).map_err(|_: nom::Err<ParseError<&str>>| Error(ParseError::Trailing))?;
    Ok((s, Vector3::new(x, y.unwrap_or(0.0), z.unwrap_or(0.0))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_offset() {
        assert_eq!(
            parse_offset("1.5, -2,3e1"),
            Ok(("", na::vector![1.5, -2.0, 30.0]))
        );
    }

    #[test]
    fn parse_partial_offset() {
        assert_eq!(parse_offset("4"), Ok(("", na::vector![4.0, 0.0, 0.0])));
        assert_eq!(parse_offset(" 4 ,5 "), Ok(("", na::vector![4.0, 5.0, 0.0])));
    }

    #[test]
    fn trailing_garbage() {
        assert_eq!(parse_offset("1,2,3,4"), Err(Error(ParseError::Trailing)));
        assert!(parse_offset("north").is_err());
    }
}
