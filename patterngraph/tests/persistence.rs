use patterngraph::{Graph, GraphError, ObjectId, SelectOp, Tolerances, Vec2};
use serde_json::json;

fn v(x: f32, y: f32) -> Vec2 {
    Vec2::new(x, y)
}

// outline with a cubic side, a dart chain and an inner closed pocket
fn piece() -> (Graph, ObjectId) {
    let mut g = Graph::new();
    let a = g.add_curve(&[v(0.0, 0.0), v(4.0, 0.0)]).unwrap();
    let b = g
        .add_curve(&[v(4.0, 0.0), v(4.5, 1.0), v(4.5, 2.0), v(4.0, 3.0)])
        .unwrap();
    let c = g.add_curve(&[v(4.0, 3.0), v(2.0, 3.5), v(0.0, 3.0)]).unwrap();
    let d = g.add_curve(&[v(0.0, 3.0), v(0.0, 0.0)]).unwrap();
    let outline = g.add_loop(&[a, b, c, d], true).unwrap();

    let d1 = g.add_curve(&[v(1.5, 0.5), v(2.0, 1.5)]).unwrap();
    let d2 = g.add_curve(&[v(2.0, 1.5), v(2.5, 0.5)]).unwrap();
    g.add_loop(&[d1, d2], false).unwrap();

    let p = [v(3.0, 2.0), v(3.5, 2.0), v(3.5, 2.5)];
    let pocket: Vec<ObjectId> = (0..3)
        .map(|i| g.add_curve(&[p[i], p[(i + 1) % 3]]).unwrap())
        .collect();
    g.add_loop(&pocket, false).unwrap();
    g.select_one(d1, SelectOp::This);
    (g, outline)
}

#[test]
fn serialize_deserialize_is_a_fixed_point() {
    let (g, outline) = piece();
    let first = g.to_json_value();
    let back = Graph::from_json_value(first.clone()).unwrap();
    assert_eq!(back.to_json_value(), first);

    assert_eq!(back.bounding_loop(), Ok(Some(outline)));
    for p in g.key_points() {
        let q = back.key_point_position(p.id()).unwrap();
        assert!(q.distance(p.position()) < 1e-6);
    }
    for c in g.curves() {
        assert_eq!(back.get_curve(c.id()).unwrap().key_points(), c.key_points());
    }
    for l in g.loops() {
        assert_eq!(back.loop_curves(l.id()).unwrap(), g.loop_curves(l.id()).unwrap());
    }
    assert_eq!(back.selected_curves(), g.selected_curves());
    assert_eq!(back.bound(), g.bound());
    back.validate().unwrap();
}

#[test]
fn tolerances_travel_with_the_document() {
    let tol = Tolerances {
        point_merge_dist: 0.5,
        ..Tolerances::default()
    };
    let mut g = Graph::with_tolerances(tol);
    g.add_curve(&[v(0.0, 0.0), v(1.0, 0.0)]).unwrap();
    let back = Graph::from_json_str(&g.to_json_string()).unwrap();
    assert_eq!(back.tolerances(), tol);
}

#[test]
fn duplicate_curves_in_document_are_unified() {
    let doc = json!({
        "version": 1, "id": 70000, "type": "Graph",
        "key-points": [
            {"KeyPoint": {"id": 70001, "x": 0.0, "y": 0.0}},
            {"KeyPoint": {"id": 70002, "x": 1.0, "y": 0.0}},
            {"KeyPoint": {"id": 70003, "x": 0.0, "y": 1.0}}
        ],
        "curves": [
            {"Line": {"id": 70010, "key-points": [70001, 70002]}},
            {"Line": {"id": 70011, "key-points": [70002, 70001]}},
            {"Line": {"id": 70012, "key-points": [70002, 70003]}},
            {"Line": {"id": 70013, "key-points": [70003, 70001]}}
        ],
        "loops": [{"Loop": {"id": 70020, "curves": [70011, 70012, 70013]}}]
    });
    let g = Graph::from_json_value(doc).unwrap();
    assert_eq!(g.curve_count(), 3);
    assert_eq!(g.loop_curves(70020).unwrap(), vec![70010, 70012, 70013]);
    assert!(g.is_loop_closed(70020).unwrap());
    assert_eq!(g.bounding_loop(), Ok(Some(70020)));
    g.validate().unwrap();
}

#[test]
fn second_bounding_loop_is_rejected() {
    let mut doc = piece().0.to_json_value();
    // the pocket is the last loop and is closed
    doc["loops"][2]["Loop"]["bounding"] = json!(true);
    assert_eq!(
        Graph::from_json_value(doc).err(),
        Some(GraphError::MultipleBoundingLoops)
    );
}

#[test]
fn key_point_cap_is_enforced() {
    let too_many = 200_001usize;
    let pts: Vec<_> = (0..too_many)
        .map(|i| json!({"KeyPoint": {"id": i + 1, "x": 0.0, "y": 0.0}}))
        .collect();
    let doc = json!({"version": 1, "id": 1, "type": "Graph", "key-points": pts});
    assert!(matches!(Graph::from_json_value(doc), Err(GraphError::Limits(_))));
}

#[test]
fn garbage_is_an_error_not_a_panic() {
    for text in ["", "[]", "{\"version\":1}", "{\"version\":1,\"id\":-4,\"type\":\"Graph\"}"] {
        let err = Graph::from_json_str(text).unwrap_err();
        assert_eq!(err.code(), "invalid_json");
    }
    let future = json!({"version": 99, "id": 1, "type": "Graph"});
    assert!(matches!(Graph::from_json_value(future), Err(GraphError::Json(_))));
}
