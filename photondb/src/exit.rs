use binrw::binrw;
use crate::Point192;

#[binrw]
#[brw(magic = b"PHOTEXIT")]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExitHeader {
    pub version: u32,
}

/// Final state of one terminated photon
#[binrw]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExitRecord {
    pub position  : Point192, // 24  mm
    pub direction : Point192, // 24  direction cosines
    pub weight    : f64,      //  8
    pub total_time: f64,      //  8  ns
    pub state     : u32,      //  4  photon state flags
}

writer!(Writer ExitHeader ExitRecord);
reader!(Reader ExitHeader ExitRecord);
