use criterion::{black_box, criterion_group, criterion_main, Criterion};
use iron_front::battle::{
    compute_reachable, compute_targets, update_visibility, Battlefield, BattleMap, GridCoord, Rules, Team,
    TerrainType, UnitType, VisibilityGrid,
};

/// 40x40 map with scattered woods and ruins and two lines of infantry
fn crowded_field() -> Battlefield {
    let mut map = BattleMap::new(40, 40);
    for i in 0..40 {
        if i % 5 == 0 {
            map.fill(GridCoord::new(i, 12), GridCoord::new(i + 1, 14), TerrainType::Forest);
            map.fill(GridCoord::new(39 - i, 25), GridCoord::new(38 - i, 26), TerrainType::Ruins);
        }
    }
    map.fill(GridCoord::new(0, 19), GridCoord::new(39, 20), TerrainType::Mud);

    let mut field = Battlefield::new(map);
    for x in (0..40).step_by(3) {
        field.units.spawn(UnitType::Infantry, Team::Player, GridCoord::new(x, 4));
        field.units.spawn(UnitType::Infantry, Team::Enemy, GridCoord::new(x, 35));
    }
    field.units.spawn(UnitType::Scout, Team::Player, GridCoord::new(20, 18));
    field.units.spawn(UnitType::Cavalry, Team::Player, GridCoord::new(10, 10));
    field
}

fn bench_visibility(c: &mut Criterion) {
    let field = crowded_field();
    let rules = Rules::default();
    let mut grid = VisibilityGrid::new(40, 40);

    c.bench_function("update_visibility_40x40", |b| {
        b.iter(|| {
            update_visibility(&mut grid, Team::Player, black_box(&field), &rules);
        })
    });
}

fn bench_reachable(c: &mut Criterion) {
    let field = crowded_field();
    let rules = Rules::default();
    let cavalry = field
        .units
        .iter()
        .find(|u| u.unit_type == UnitType::Cavalry)
        .cloned();

    c.bench_function("compute_reachable_cavalry", |b| {
        b.iter(|| {
            if let Some(unit) = &cavalry {
                black_box(compute_reachable(unit, black_box(&field), &rules));
            }
        })
    });
}

fn bench_targets(c: &mut Criterion) {
    let field = crowded_field();
    let rules = Rules::default();
    let mut grid = VisibilityGrid::new(40, 40);
    update_visibility(&mut grid, Team::Player, &field, &rules);

    c.bench_function("compute_targets_all_player_units", |b| {
        b.iter(|| {
            for unit in field.units.living_on(Team::Player) {
                black_box(compute_targets(unit, &field, &rules, &grid));
            }
        })
    });
}

criterion_group!(benches, bench_visibility, bench_reachable, bench_targets);
criterion_main!(benches);
