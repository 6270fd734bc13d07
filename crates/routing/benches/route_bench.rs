use std::sync::Arc;

use common::{OrderId, TaskId, WaveId, WorkerId};
use criterion::{Criterion, criterion_group, criterion_main};
use route_store::InMemoryRouteStore;
use routing::{
    AssignWorker, CompleteStage, CreateRoute, ProcessPathType, ResolveRequest, RouteResolver,
    RouteService, StartStage, TaskRoute, TemplateRegistry,
};

fn bench_resolve(c: &mut Criterion) {
    let resolver = RouteResolver::new(Arc::new(TemplateRegistry::with_defaults()));
    let request = ResolveRequest::new("ORD-BENCH", "WAVE-1", ProcessPathType::pick_wall_pack(), 8);

    c.bench_function("routing/resolve", |b| {
        b.iter(|| resolver.resolve(&request).unwrap());
    });
}

fn bench_transitions(c: &mut Criterion) {
    let registry = TemplateRegistry::with_defaults();
    let template = registry
        .select(&ProcessPathType::pick_gift_wrap_pack(), 1)
        .unwrap()
        .clone();

    c.bench_function("routing/drive_five_stage_route", |b| {
        b.iter(|| {
            let mut route = TaskRoute::new(
                OrderId::new("ORD-BENCH"),
                WaveId::new("WAVE-1"),
                &template,
                vec![],
                None,
            )
            .unwrap();
            while !route.is_completed() {
                route
                    .assign_worker_to_current_stage(WorkerId::new("W-1"), TaskId::new("T-1"))
                    .unwrap();
                route.start_current_stage().unwrap();
                route.complete_current_stage().unwrap();
            }
            route
        });
    });
}

fn bench_service_cycle(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let registry = Arc::new(TemplateRegistry::with_defaults());

    c.bench_function("routing/service_pick_pack_cycle", |b| {
        b.iter(|| {
            rt.block_on(async {
                let service = RouteService::new(InMemoryRouteStore::new(), registry.clone());
                let route_id = service
                    .create_route(CreateRoute::new(
                        "ORD-BENCH",
                        "WAVE-1",
                        ProcessPathType::pick_pack(),
                        2,
                    ))
                    .await
                    .unwrap()
                    .aggregate
                    .route_id();

                for _ in 0..2 {
                    service
                        .assign_worker(AssignWorker::new(route_id, "W-1", "T-1"))
                        .await
                        .unwrap();
                    service.start_stage(StartStage::new(route_id)).await.unwrap();
                    service
                        .complete_stage(CompleteStage::new(route_id))
                        .await
                        .unwrap();
                }
            });
        });
    });
}

criterion_group!(
    benches,
    bench_resolve,
    bench_transitions,
    bench_service_cycle
);
criterion_main!(benches);
