//! Shared fixtures for integration tests

#![allow(dead_code)]

use shepherd_shared::hierarchy::HierarchyIndex;
use shepherd_shared::testing::Fixture;
use uuid::Uuid;

pub const JWT_SECRET: &str = "test-secret-key-at-least-32-bytes-long";

/// Zone with two areas: A1 holds 3 cells and 40 members, A2 holds 2 cells
/// and 15 members
pub struct ZoneScenario {
    pub fixture: Fixture,
    pub zone: Uuid,
    pub a1: Uuid,
    pub a2: Uuid,
    pub a1_cells: Vec<Uuid>,
    pub a2_cells: Vec<Uuid>,
}

impl ZoneScenario {
    pub fn new() -> Self {
        let mut fixture = Fixture::new();
        let zone = fixture.zone("Zone Z");
        let a1 = fixture.area(zone, "A1");
        let a2 = fixture.area(zone, "A2");

        let a1_cells: Vec<Uuid> = (1..=3)
            .map(|i| fixture.cell(a1, &format!("A1 cell {i}")))
            .collect();
        let a2_cells: Vec<Uuid> = (1..=2)
            .map(|i| fixture.cell(a2, &format!("A2 cell {i}")))
            .collect();

        for (cell, count) in a1_cells.iter().zip([14, 13, 13]) {
            fixture.members(*cell, count);
        }
        for (cell, count) in a2_cells.iter().zip([8, 7]) {
            fixture.members(*cell, count);
        }

        Self {
            fixture,
            zone,
            a1,
            a2,
            a1_cells,
            a2_cells,
        }
    }

    pub fn index(&self) -> HierarchyIndex {
        self.fixture.build()
    }
}
