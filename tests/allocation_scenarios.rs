use carrier_fit::allocator::{AllocationConfig, allocate};
use carrier_fit::catalog::default_carriers;
use carrier_fit::fit::FitStatus;
use carrier_fit::model::{CarrierConfig, LoadingConstraint, SkuRecord, ValidationError};
use carrier_fit::outliers::find_outliers;
use carrier_fit::policy::AllocationMode;

fn tray() -> CarrierConfig {
    CarrierConfig::new("TRAY", "Tray 600x400", (570.0, 370.0, 200.0), 35.0).unwrap()
}

fn sku(id: &str, dims: (f64, f64, f64), weight: f64, stock: u64) -> SkuRecord {
    SkuRecord::new(id, dims, weight, stock).unwrap()
}

fn config(mode: AllocationMode) -> AllocationConfig {
    AllocationConfig::builder().mode(mode).build()
}

/// Deterministic pseudo-random catalog.
fn synthetic_catalog(count: usize) -> Vec<SkuRecord> {
    let mut state: u64 = 0x2545_F491_4F6C_DD1D;
    let mut next = move |max: u64| {
        state = state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        (state >> 33) % max
    };
    (0..count)
        .map(|i| {
            let dims = (
                10.0 + next(800) as f64,
                10.0 + next(450) as f64,
                5.0 + next(260) as f64 + 0.5,
            );
            let weight = 0.1 + next(500) as f64 / 10.0;
            sku(&format!("SKU-{i:05}"), dims, weight, next(2000))
        })
        .collect()
}

#[test]
fn reference_sku_needs_nine_locations() {
    let skus = [sku("REF", (100.0, 80.0, 60.0), 1.0, 500)];
    let result = allocate(&skus, &[tray()], &AllocationConfig::default()).unwrap();

    let entry = &result.results_for("REF")[0];
    assert_eq!(entry.status, FitStatus::Fit);
    assert_eq!(entry.orientation.unwrap().to_string(), "LWH");
    assert_eq!(entry.units_per_carrier, 60);
    assert_eq!(entry.locations_required, 9);

    let expected = (500.0 * 0.00048) / (9.0 * (0.570 * 0.370 * 0.200));
    assert!((entry.filling_rate - expected).abs() < 1e-9);
    assert!((entry.filling_rate - 0.6322).abs() < 1e-3);

    let stats = result.stats_for("TRAY").unwrap();
    assert_eq!(stats.total_locations, 9);
    assert_eq!(stats.fit_count, 1);
}

#[test]
fn oversized_sku_is_an_outlier_in_every_mode() {
    let skus = [
        sku("OK", (100.0, 80.0, 60.0), 1.0, 10),
        sku("BEAM", (4000.0, 100.0, 100.0), 20.0, 2),
    ];
    for mode in [
        AllocationMode::Independent,
        AllocationMode::Prioritized,
        AllocationMode::BestFit,
    ] {
        let result = allocate(&skus, &default_carriers(), &config(mode)).unwrap();
        assert_eq!(result.outliers, vec!["BEAM".to_string()]);
        assert!(
            result
                .results_for("BEAM")
                .iter()
                .all(|entry| entry.status == FitStatus::NotFit)
        );
    }
}

#[test]
fn prioritized_and_best_fit_pick_different_carriers() {
    let first = CarrierConfig::new("ROOMY", "Roomy", (200.0, 200.0, 200.0), 50.0)
        .unwrap()
        .with_priority(1);
    let second = CarrierConfig::new("SNUG", "Snug", (210.0, 210.0, 100.0), 50.0)
        .unwrap()
        .with_priority(2);
    let carriers = [first, second];
    let skus = [sku("CUBE", (100.0, 100.0, 100.0), 1.0, 4)];

    let prioritized = allocate(&skus, &carriers, &config(AllocationMode::Prioritized)).unwrap();
    let picked = prioritized.results_for("CUBE");
    assert_eq!(picked.len(), 1);
    assert_eq!(picked[0].carrier_id, "ROOMY");
    assert!((picked[0].filling_rate - 0.5).abs() < 1e-9);

    let best_fit = allocate(&skus, &carriers, &config(AllocationMode::BestFit)).unwrap();
    let picked = best_fit.results_for("CUBE");
    assert_eq!(picked.len(), 1);
    assert_eq!(picked[0].carrier_id, "SNUG");
    assert!(picked[0].filling_rate > 0.9);
}

#[test]
fn single_carrier_modes_agree() {
    let carrier = tray().with_priority(1);
    let skus = [
        sku("FIT", (100.0, 80.0, 60.0), 1.0, 500),
        sku("EDGE", (569.0, 100.0, 100.0), 2.0, 7),
        sku("BIG", (700.0, 100.0, 100.0), 2.0, 7),
        sku("HEAVY", (100.0, 80.0, 60.0), 80.0, 7),
        sku("EMPTY", (50.0, 50.0, 50.0), 0.5, 0),
    ];

    let independent = allocate(&skus, &[carrier.clone()], &config(AllocationMode::Independent))
        .unwrap();
    for mode in [AllocationMode::Prioritized, AllocationMode::BestFit] {
        let exclusive = allocate(&skus, &[carrier.clone()], &config(mode)).unwrap();
        for item in &skus {
            let all = independent.results_for(&item.id);
            assert_eq!(all.len(), 1);
            let picked = exclusive.results_for(&item.id);
            if all[0].status == FitStatus::NotFit {
                assert!(picked.is_empty(), "{} should be unassigned", item.id);
            } else {
                assert_eq!(picked, all, "{} differs in {}", item.id, mode);
            }
        }
        assert_eq!(exclusive.outliers, independent.outliers);
    }
}

#[test]
fn parallel_and_sequential_runs_are_identical() {
    let skus = synthetic_catalog(1500);
    let mut carriers = default_carriers();
    carriers[0].priority = Some(2);
    carriers[1].priority = Some(1);
    carriers.push(
        CarrierConfig::new("UPRIGHT", "Upright bin", (400.0, 300.0, 280.0), 25.0)
            .unwrap()
            .with_constraint(LoadingConstraint::UprightOnly)
            .with_priority(3),
    );
    carriers.push(
        CarrierConfig::new("FLAT", "Flat drawer", (600.0, 400.0, 90.0), 30.0)
            .unwrap()
            .with_constraint(LoadingConstraint::FlatOnly)
            .with_available_locations(5000),
    );

    for mode in [
        AllocationMode::Independent,
        AllocationMode::Prioritized,
        AllocationMode::BestFit,
    ] {
        let parallel = AllocationConfig::builder().mode(mode).parallel(true).build();
        let sequential = AllocationConfig::builder().mode(mode).parallel(false).build();

        let a = allocate(&skus, &carriers, &parallel).unwrap();
        let b = allocate(&skus, &carriers, &sequential).unwrap();
        let c = allocate(&skus, &carriers, &parallel).unwrap();
        assert_eq!(a, b);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&c).unwrap()
        );
    }
}

#[test]
fn locations_never_decrease_with_stock() {
    let mut previous = 0;
    for stock in (0..=600).step_by(7) {
        let skus = [sku("S", (100.0, 80.0, 60.0), 1.0, stock)];
        let result = allocate(&skus, &[tray()], &AllocationConfig::default()).unwrap();
        let locations = result.results_for("S")[0].locations_required;
        assert!(locations >= previous);
        previous = locations;
        if stock == 0 {
            assert_eq!(locations, 0);
        }
    }
}

#[test]
fn zero_stock_is_computable() {
    let skus = [sku("NONE", (100.0, 80.0, 60.0), 1.0, 0)];
    let result = allocate(&skus, &[tray()], &config(AllocationMode::BestFit)).unwrap();
    let entry = &result.results_for("NONE")[0];
    assert_eq!(entry.status, FitStatus::Fit);
    assert_eq!(entry.locations_required, 0);
    assert_eq!(entry.filling_rate, 0.0);
    assert!(result.outliers.is_empty());
}

#[test]
fn no_active_carriers_yields_empty_allocation() {
    let skus = [
        sku("A", (100.0, 80.0, 60.0), 1.0, 10),
        sku("B", (10.0, 10.0, 10.0), 0.1, 1),
    ];
    let carriers = [tray().with_active(false)];
    for mode in [
        AllocationMode::Independent,
        AllocationMode::Prioritized,
        AllocationMode::BestFit,
    ] {
        let result = allocate(&skus, &carriers, &config(mode)).unwrap();
        assert!(result.carrier_stats.is_empty());
        assert_eq!(result.outliers, vec!["A".to_string(), "B".to_string()]);
        assert!(result.results_for("A").is_empty());
        assert_eq!(result.summary.assigned_skus, 0);
    }
}

#[test]
fn configuration_errors_surface_before_processing() {
    let mut broken = tray();
    broken.inner_height_mm = -5.0;
    let err = allocate(
        &[sku("A", (100.0, 80.0, 60.0), 1.0, 10)],
        &[broken],
        &AllocationConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, ValidationError::InvalidDimension(_)));
}

#[test]
fn adding_a_carrier_removes_an_outlier() {
    let skus = [sku("LONG", (1200.0, 300.0, 150.0), 30.0, 3)];
    let config = AllocationConfig::default();

    let before = find_outliers(&skus, &[tray()], &config).unwrap();
    assert_eq!(before, vec!["LONG".to_string()]);

    let shelf = CarrierConfig::new("SHELF", "Shelf", (1500.0, 400.0, 200.0), 60.0).unwrap();
    let after = allocate(&skus, &[tray(), shelf], &config).unwrap();
    assert!(after.outliers.is_empty());
    assert!(after.results_for("LONG").iter().any(|r| r.carrier_id == "SHELF" && r.is_storable()));
}

#[test]
fn raising_the_threshold_only_downgrades() {
    let skus = synthetic_catalog(200);
    let carriers = default_carriers();
    let loose = allocate(&skus, &carriers, &AllocationConfig::default()).unwrap();
    let strict = allocate(
        &skus,
        &carriers,
        &AllocationConfig::builder().borderline_threshold_mm(25.0).build(),
    )
    .unwrap();

    for item in &skus {
        let before = loose.results_for(&item.id);
        let after = strict.results_for(&item.id);
        for (b, a) in before.iter().zip(after) {
            assert!(a.status.rank() <= b.status.rank());
            assert_eq!(
                a.status == FitStatus::NotFit,
                b.status == FitStatus::NotFit,
                "NotFit must not depend on the threshold ({})",
                item.id
            );
        }
    }
    assert_eq!(loose.outliers, strict.outliers);
}
