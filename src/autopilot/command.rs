use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Reference command: autopilot -> low-level controller set-points
// ---------------------------------------------------------------------------

/// Fixed four-channel set-point vector `[nz, ps, ny_r, throttle]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceCommand {
    pub nz: f64,       // desired normal load factor, g
    pub ps: f64,       // desired stability-axis roll rate, rad/s
    pub ny_r: f64,     // yaw-channel set-point, rad/s over coordinated
    pub throttle: f64, // throttle offset from trim
}

impl ReferenceCommand {
    pub const ZERO: ReferenceCommand = ReferenceCommand {
        nz: 0.0,
        ps: 0.0,
        ny_r: 0.0,
        throttle: 0.0,
    };

    pub fn as_array(&self) -> [f64; 4] {
        [self.nz, self.ps, self.ny_r, self.throttle]
    }

    pub fn is_zero(&self) -> bool {
        self.as_array().iter().all(|v| *v == 0.0)
    }
}

impl From<[f64; 4]> for ReferenceCommand {
    fn from(v: [f64; 4]) -> Self {
        ReferenceCommand {
            nz: v[0],
            ps: v[1],
            ny_r: v[2],
            throttle: v[3],
        }
    }
}
