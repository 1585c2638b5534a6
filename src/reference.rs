//! Static province and unit tables, built once per process

use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Province {
    pub id: u32,
    pub name: &'static str,
    pub code: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Unit {
    pub id: u32,
    pub name: &'static str,
    pub code: &'static str,
    pub province_id: u32,
}

static PROVINCES: Lazy<Vec<Province>> = Lazy::new(|| {
    [
        (1, "Hà Nội", "HN"),
        (2, "Hồ Chí Minh", "HCM"),
        (3, "Đà Nẵng", "DN"),
        (4, "Hải Phòng", "HP"),
        (5, "An Giang", "AG"),
        (6, "Bà Rịa - Vũng Tàu", "BRVT"),
        (7, "Bắc Giang", "BG"),
        (8, "Bắc Kạn", "BK"),
        (9, "Bạc Liêu", "BL"),
        (10, "Bắc Ninh", "BN"),
    ]
    .into_iter()
    .map(|(id, name, code)| Province { id, name, code })
    .collect()
});

static UNITS: Lazy<HashMap<u32, Vec<Unit>>> = Lazy::new(|| {
    let rows: [(u32, &str, &str, u32); 17] = [
        (1, "Sở Giáo dục và Đào tạo Hà Nội", "SGDDT_HN", 1),
        (2, "Sở Y tế Hà Nội", "SYT_HN", 1),
        (3, "Sở Tài chính Hà Nội", "STC_HN", 1),
        (4, "UBND Quận Ba Đình", "UBND_BD", 1),
        (5, "UBND Quận Hoàn Kiếm", "UBND_HK", 1),
        (6, "Sở Giáo dục và Đào tạo TP.HCM", "SGDDT_HCM", 2),
        (7, "Sở Y tế TP.HCM", "SYT_HCM", 2),
        (8, "Sở Tài chính TP.HCM", "STC_HCM", 2),
        (9, "UBND Quận 1", "UBND_Q1", 2),
        (10, "UBND Quận 3", "UBND_Q3", 2),
        (11, "Sở Giáo dục và Đào tạo Đà Nẵng", "SGDDT_DN", 3),
        (12, "Sở Y tế Đà Nẵng", "SYT_DN", 3),
        (13, "Sở Du lịch Đà Nẵng", "SDL_DN", 3),
        (14, "Sở Giáo dục và Đào tạo Hải Phòng", "SGDDT_HP", 4),
        (15, "Cảng Hải Phòng", "CANG_HP", 4),
        (16, "Sở Nông nghiệp An Giang", "SNN_AG", 5),
        (17, "Sở Thủy lợi An Giang", "STL_AG", 5),
    ];

    let mut units: HashMap<u32, Vec<Unit>> = HashMap::new();
    for (id, name, code, province_id) in rows {
        units.entry(province_id).or_default().push(Unit {
            id,
            name,
            code,
            province_id,
        });
    }
    units
});

pub fn provinces() -> &'static [Province] {
    &PROVINCES
}

pub fn province(id: u32) -> Option<&'static Province> {
    PROVINCES.iter().find(|p| p.id == id)
}

/// Units of a province; unknown ids yield an empty slice.
pub fn units_by_province(province_id: u32) -> &'static [Unit] {
    UNITS.get(&province_id).map(Vec::as_slice).unwrap_or(&[])
}
