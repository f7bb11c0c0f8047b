use binrw::binrw;

#[binrw]
#[brw(magic = b"COLLINFO")]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionHeader {
    pub n_subregions: u32,
}

#[binrw]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubRegionRecord {
    pub path_length: f64, // mm travelled inside the region
    pub collisions : u64, // real collisions inside the region
}

/// Per-region history of one photon
#[binrw]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CollisionRecord {
    #[bw(try_calc(u32::try_from(subregions.len())))]
    #[br(temp)]
    n_subregions: u32,

    #[br(count = n_subregions)]
    pub subregions: Vec<SubRegionRecord>,
}

writer!(Writer CollisionHeader CollisionRecord);
reader!(Reader CollisionHeader CollisionRecord);
