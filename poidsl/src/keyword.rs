//! Curve and behavior keywords. Unknown keywords fall back to
//! `Linear` / `Transform`.

use tracing::warn;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Default)]
pub enum Interpolation {
    #[default]
    Linear,
    /// Ping-pong from -> to -> from
    Cyclic,
    /// Full cosine period, from -> to -> from
    Sine,
    /// Half sine period, from -> to -> from
    Halfsine,
    /// Cosine ease from -> to
    Smooth,
}

impl Interpolation {
    pub fn from_keyword(s: &str) -> Option<Self> {
        use Interpolation::*;
        Some(match s.trim().to_ascii_lowercase().as_str() {
            "" | "linear" => Linear,
            "cyclic" => Cyclic,
            "sine" => Sine,
            "halfsine" => Halfsine,
            "smooth" => Smooth,
            _ => return None,
        })
    }

    pub fn from_keyword_or_default(s: &str) -> Self {
        Self::from_keyword(s).unwrap_or_else(|| {
            warn!(keyword = s, "Unknown interpolation, using linear");
            Interpolation::default()
        })
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Default)]
pub enum BehaviorKind {
    #[default]
    Transform,
    Rotate,
    Scale,
    Destroy,
    Duplicate,
    Fade,
    Grow,
    Volume,
    SpatialBlend,
    Buzz,
}

impl BehaviorKind {
    pub fn from_keyword(s: &str) -> Option<Self> {
        use BehaviorKind::*;
        Some(match s.trim().to_ascii_lowercase().as_str() {
            "" | "transform" => Transform,
            "rotate" => Rotate,
            "scale" => Scale,
            "destroy" => Destroy,
            "duplicate" => Duplicate,
            "fade" => Fade,
            "grow" => Grow,
            "volume" => Volume,
            "spatialblend" | "spatial-blend" => SpatialBlend,
            "buzz" => Buzz,
            _ => return None,
        })
    }

    pub fn from_keyword_or_default(s: &str) -> Self {
        Self::from_keyword(s).unwrap_or_else(|| {
            warn!(keyword = s, "Unknown animation type, using transform");
            BehaviorKind::default()
        })
    }

    pub fn name(&self) -> &'static str {
        use BehaviorKind::*;
        match self {
            Transform => "transform",
            Rotate => "rotate",
            Scale => "scale",
            Destroy => "destroy",
            Duplicate => "duplicate",
            Fade => "fade",
            Grow => "grow",
            Volume => "volume",
            SpatialBlend => "spatialblend",
            Buzz => "buzz",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_are_case_insensitive() {
        assert_eq!(
            Interpolation::from_keyword("HalfSine"),
            Some(Interpolation::Halfsine)
        );
        assert_eq!(
            BehaviorKind::from_keyword(" SpatialBlend "),
            Some(BehaviorKind::SpatialBlend)
        );
    }

    #[test]
    fn unknown_keywords_fall_back() {
        assert_eq!(
            Interpolation::from_keyword_or_default("bounce"),
            Interpolation::Linear
        );
        assert_eq!(
            BehaviorKind::from_keyword_or_default("explode"),
            BehaviorKind::Transform
        );
        assert_eq!(BehaviorKind::from_keyword(""), Some(BehaviorKind::Transform));
    }
}
