use std::fmt;

/// Bit set describing how a photon stands: alive, or which way it ended,
/// plus transient pseudo-collision flags set while it sits on a virtual
/// boundary.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PhotonState(pub u32);

impl PhotonState {
    pub const ALIVE                            : Self = Self(1 << 0);
    pub const EXITED_OUT_TOP                   : Self = Self(1 << 1);
    pub const EXITED_OUT_BOTTOM                : Self = Self(1 << 2);
    pub const ABSORBED                         : Self = Self(1 << 3);
    pub const KILLED_RUSSIAN_ROULETTE          : Self = Self(1 << 4);
    pub const KILLED_OVER_MAXIMUM_PATH_LENGTH  : Self = Self(1 << 5);
    pub const KILLED_OVER_MAXIMUM_COLLISIONS   : Self = Self(1 << 6);

    pub const PSEUDO_DIFFUSE_REFLECTANCE       : Self = Self(1 << 8);
    pub const PSEUDO_DIFFUSE_TRANSMITTANCE     : Self = Self(1 << 9);
    pub const PSEUDO_SURFACE_RADIANCE          : Self = Self(1 << 10);
    pub const PSEUDO_GENERIC_VOLUME            : Self = Self(1 << 11);

    const PSEUDO: u32 = 0xf << 8;
    const NAMES: [(Self, &'static str); 11] = [
        (Self::ALIVE,                           "Alive"),
        (Self::EXITED_OUT_TOP,                  "ExitedOutTop"),
        (Self::EXITED_OUT_BOTTOM,               "ExitedOutBottom"),
        (Self::ABSORBED,                        "Absorbed"),
        (Self::KILLED_RUSSIAN_ROULETTE,         "KilledRussianRoulette"),
        (Self::KILLED_OVER_MAXIMUM_PATH_LENGTH, "KilledOverMaximumPathLength"),
        (Self::KILLED_OVER_MAXIMUM_COLLISIONS,  "KilledOverMaximumCollisions"),
        (Self::PSEUDO_DIFFUSE_REFLECTANCE,      "PseudoDiffuseReflectance"),
        (Self::PSEUDO_DIFFUSE_TRANSMITTANCE,    "PseudoDiffuseTransmittance"),
        (Self::PSEUDO_SURFACE_RADIANCE,         "PseudoSurfaceRadiance"),
        (Self::PSEUDO_GENERIC_VOLUME,           "PseudoGenericVolume"),
    ];

    pub fn has   (self, flag: Self) -> bool { self.0 & flag.0 == flag.0 }
    pub fn add   (&mut self, flag: Self) { self.0 |=  flag.0 }
    pub fn remove(&mut self, flag: Self) { self.0 &= !flag.0 }

    pub fn is_alive(self) -> bool { self.has(Self::ALIVE) }

    pub fn clear_pseudo(&mut self) { self.0 &= !Self::PSEUDO }

    /// Mark the photon dead for the given reason
    pub fn kill(&mut self, reason: Self) {
        self.remove(Self::ALIVE);
        self.add(reason);
    }
}

impl fmt::Debug for PhotonState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = Self::NAMES.iter()
            .filter(|(flag, _)| self.has(*flag))
            .map(|(_, name)| *name)
            .collect();
        write!(f, "PhotonState({})", names.join(" | "))
    }
}
