use std::fmt;

pub const MIN_SET_POINT: i32 = 16;
pub const MAX_SET_POINT: i32 = 32;

// Values are compared in hundredths of a degree.
const SCALE: i32 = 100;
const ROUND_UP_REMAINDER: i32 = 50;

/// Integer temperature the air conditioner accepts, always within
/// `MIN_SET_POINT..=MAX_SET_POINT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SetPoint(i32);

impl SetPoint {
    pub const MIN: SetPoint = SetPoint(MIN_SET_POINT);
    pub const MAX: SetPoint = SetPoint(MAX_SET_POINT);

    pub fn new(degrees: i32) -> Option<SetPoint> {
        (MIN_SET_POINT..=MAX_SET_POINT)
            .contains(&degrees)
            .then_some(SetPoint(degrees))
    }

    pub fn degrees(self) -> i32 {
        self.0
    }

    pub fn all() -> impl Iterator<Item = SetPoint> {
        (MIN_SET_POINT..=MAX_SET_POINT).map(SetPoint)
    }
}

impl fmt::Display for SetPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Maps a control value to the nearest supported set-point.
///
/// Values at or beyond the supported range are clamped. Inside the range the
/// value is truncated to hundredths and rounded half-up, so `20.50` becomes
/// `21` while `20.499` stays `20`.
pub fn quantize(value: f64) -> SetPoint {
    if value >= MAX_SET_POINT as f64 {
        return SetPoint::MAX;
    }
    // NaN fails every comparison and would otherwise cast to 0.
    if value <= MIN_SET_POINT as f64 || value.is_nan() {
        return SetPoint::MIN;
    }

    let scaled = (value * SCALE as f64) as i32;
    let remainder = scaled % SCALE;

    if remainder >= ROUND_UP_REMAINDER {
        SetPoint(1 + scaled / SCALE)
    } else {
        SetPoint(scaled / SCALE)
    }
}
