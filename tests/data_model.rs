#![allow(missing_docs)]

use std::sync::Arc;

use phenomena::{
    container::NodePath,
    data_model::{
        value::{ShapePerObject, ShapeVariability, ValueVariability},
        Clock, DataModelError, Dataset, PropertySetBuilder, PropertyVariant, TickUnit,
        TimeConfiguration, TimeDomainItemType,
    },
    data_type::DataType,
    storage::{store::FilesystemStore, store::MemoryStore, ReadableWritableListableStorage},
};

fn build_dataset(storage: &ReadableWritableListableStorage) {
    let mut dataset = Dataset::create(storage).unwrap();
    let phenomenon = dataset.add_phenomenon("areas").unwrap();
    phenomenon.add_object_ids(&[5, 9]).unwrap();

    // A property set without domains holds constant properties.
    let constant = phenomenon
        .add_property_set("constant", PropertySetBuilder::new())
        .unwrap();
    constant
        .object_tracker_mut()
        .unwrap()
        .append_time_step(&[5, 9], None)
        .unwrap();

    // Same shape per object: one (3,) float64 value per object.
    let property = constant
        .properties_mut()
        .add_same_shape("band_means", DataType::Float64, &[3], "per-band means")
        .unwrap();
    match property.value_mut() {
        PropertyVariant::SameShape(value) => {
            value.append(&[1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        }
        _ => unreachable!(),
    }

    // Different shape per object: a (4, 6) raster for object 5, (3, 5) for 9.
    let property = constant
        .properties_mut()
        .add_different_shape("elevation", DataType::Float64, 2, "gridded elevation")
        .unwrap();
    match property.value_mut() {
        PropertyVariant::DifferentShape(value) => {
            let object_5: Vec<f64> = (0..24).map(|cell| 11.5 + f64::from(cell)).collect();
            value.add_object(5, &[4, 6], &object_5).unwrap();
            let object_9 = vec![0.0f64; 15];
            value.add_object(9, &[3, 5], &object_9).unwrap();
        }
        _ => unreachable!(),
    }

    // A property set with a time domain holds variable properties.
    let temporal = phenomenon
        .add_property_set(
            "simulated",
            PropertySetBuilder::new().with_time_domain(
                TimeConfiguration {
                    item_type: TimeDomainItemType::Box,
                },
                Clock {
                    epoch: "2000-01-01T00:00:00".to_string(),
                    unit: TickUnit::Day,
                    nr_units: 1,
                },
            ),
        )
        .unwrap();
    temporal
        .object_tracker_mut()
        .unwrap()
        .append_time_step(&[5, 9], None)
        .unwrap();
    temporal
        .object_tracker_mut()
        .unwrap()
        .append_time_step(&[9], None)
        .unwrap();
    temporal
        .time_domain_mut()
        .unwrap()
        .append_coordinates(&[0, 10, 10, 10])
        .unwrap();
    let property = temporal
        .properties_mut()
        .add_same_shape_constant_shape("discharge", DataType::Float64, &[], "outlet discharge")
        .unwrap();
    match property.value_mut() {
        PropertyVariant::SameShapeConstantShape(value) => {
            // Step 0: objects 5 and 9. Step 1: object 9 only.
            value.append(&[1.5f64, 2.5]).unwrap();
            value.append(&[3.5f64]).unwrap();
        }
        _ => unreachable!(),
    }
}

fn verify_dataset(storage: &ReadableWritableListableStorage) {
    let dataset = Dataset::open(storage).unwrap();
    assert_eq!(dataset.phenomenon_names(), vec!["areas"]);
    let phenomenon = dataset.phenomenon("areas").unwrap();
    assert_eq!(phenomenon.object_ids().unwrap(), vec![5, 9]);
    assert_eq!(
        phenomenon.property_set_names(),
        vec!["constant", "simulated"]
    );

    let constant = phenomenon.property_set("constant").unwrap();
    let properties = constant.properties();
    assert_eq!(
        properties.shape_per_object("band_means").unwrap(),
        ShapePerObject::Same
    );
    assert_eq!(
        properties.value_variability("band_means").unwrap(),
        ValueVariability::Constant
    );
    match properties.property("band_means").unwrap().value() {
        PropertyVariant::SameShape(value) => {
            assert_eq!(value.value_shape(), vec![3]);
            assert_eq!(value.read_object::<f64>(0).unwrap(), vec![1.0, 2.0, 3.0]);
            assert_eq!(value.read_object::<f64>(1).unwrap(), vec![4.0, 5.0, 6.0]);
        }
        _ => unreachable!(),
    }
    assert_eq!(
        properties.shape_per_object("elevation").unwrap(),
        ShapePerObject::Different
    );
    match properties.property("elevation").unwrap().value() {
        PropertyVariant::DifferentShape(value) => {
            assert_eq!(value.value_shape(5).unwrap(), vec![4, 6]);
            assert_eq!(value.value_shape(9).unwrap(), vec![3, 5]);
            let (shape, elements) = value.read_object::<f64>(5).unwrap();
            assert_eq!(shape, vec![4, 6]);
            assert_eq!(
                &elements[..6],
                &[11.5, 12.5, 13.5, 14.5, 15.5, 16.5]
            );
            assert_eq!(value.object_indices().unwrap(), vec![5, 9]);
        }
        _ => unreachable!(),
    }

    let temporal = phenomenon.property_set("simulated").unwrap();
    assert!(temporal.has_time_domain());
    assert!(temporal.owns_time_domain());
    let tracker = temporal.object_tracker();
    assert_eq!(tracker.nr_time_steps(), 2);
    assert_eq!(tracker.active_set_sizes().unwrap(), vec![2, 1]);
    assert_eq!(tracker.active_object_ids(0).unwrap(), vec![5, 9]);
    assert_eq!(tracker.active_object_ids(1).unwrap(), vec![9]);
    let properties = temporal.properties();
    assert_eq!(
        properties.value_variability("discharge").unwrap(),
        ValueVariability::Variable
    );
    assert_eq!(
        properties.shape_variability("discharge").unwrap(),
        ShapeVariability::Constant
    );
    match properties.property("discharge").unwrap().value() {
        PropertyVariant::SameShapeConstantShape(value) => {
            // The tracker's active-set index addresses the step's values.
            let start = tracker.active_set_index(1).unwrap();
            let size = tracker.active_set_size(1).unwrap();
            assert_eq!(value.read::<f64>(start, size).unwrap(), vec![3.5]);
            assert_eq!(value.nr_items(), 3);
        }
        _ => unreachable!(),
    }
}

#[test]
fn dataset_round_trip_memory() {
    let storage: ReadableWritableListableStorage = Arc::new(MemoryStore::new());
    build_dataset(&storage);
    verify_dataset(&storage);
}

#[test]
fn dataset_round_trip_filesystem() {
    let directory = tempfile::TempDir::new().unwrap();
    let storage: ReadableWritableListableStorage =
        Arc::new(FilesystemStore::new(directory.path()).unwrap());
    build_dataset(&storage);
    verify_dataset(&storage);
}

#[test]
fn linked_domains_are_read_only() {
    let storage: ReadableWritableListableStorage = Arc::new(MemoryStore::new());
    let mut dataset = Dataset::create(&storage).unwrap();
    let phenomenon = dataset.add_phenomenon("outlets").unwrap();
    let owner_path = {
        let owner = phenomenon
            .add_property_set(
                "simulated",
                PropertySetBuilder::new().with_time_domain(
                    TimeConfiguration {
                        item_type: TimeDomainItemType::Point,
                    },
                    Clock {
                        epoch: "2000-01-01T00:00:00".to_string(),
                        unit: TickUnit::Day,
                        nr_units: 1,
                    },
                ),
            )
            .unwrap();
        owner
            .object_tracker_mut()
            .unwrap()
            .append_time_step(&[5], None)
            .unwrap();
        owner.time_domain_mut().unwrap().append_coordinates(&[7]).unwrap();
        owner.path().clone()
    };

    let derived = phenomenon
        .add_property_set(
            "derived",
            PropertySetBuilder::new()
                .link_object_tracker(&owner_path)
                .link_time_domain(&owner_path),
        )
        .unwrap();
    assert!(!derived.owns_object_tracker());
    assert!(!derived.owns_time_domain());
    // Reads alias the owner's data; writes are rejected.
    assert_eq!(derived.time_domain().read_coordinates().unwrap(), vec![7]);
    assert!(matches!(
        derived.object_tracker_mut(),
        Err(DataModelError::NotOwned(_))
    ));
    assert!(matches!(
        derived.time_domain_mut(),
        Err(DataModelError::NotOwned(_))
    ));

    // Link resolution survives a reopen.
    let dataset = Dataset::open(&storage).unwrap();
    let derived = dataset
        .phenomenon("outlets")
        .unwrap()
        .property_set("derived")
        .unwrap();
    assert!(!derived.owns_object_tracker());
    assert_eq!(derived.object_tracker().active_object_ids(0).unwrap(), vec![5]);
    assert_eq!(
        derived.time_domain().path(),
        &NodePath::new("/phenomena/outlets/property_sets/simulated/time_domain").unwrap()
    );
}

#[test]
fn property_names_unique_across_variants() {
    let storage: ReadableWritableListableStorage = Arc::new(MemoryStore::new());
    let mut dataset = Dataset::create(&storage).unwrap();
    let phenomenon = dataset.add_phenomenon("areas").unwrap();
    let set = phenomenon
        .add_property_set("constant", PropertySetBuilder::new())
        .unwrap();
    set.properties_mut()
        .add_same_shape_variable_shape("extent", DataType::UInt32, 2, "")
        .unwrap();
    assert!(matches!(
        set.properties_mut()
            .add_different_shape_variable_shape("extent", DataType::UInt32, 2, ""),
        Err(DataModelError::AlreadyExists(_))
    ));
    assert!(matches!(
        set.properties_mut()
            .add_same_shape("extent", DataType::UInt32, &[2], ""),
        Err(DataModelError::AlreadyExists(_))
    ));
}
