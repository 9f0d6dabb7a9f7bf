//! 所有引擎适配器共享的一致性测试
//!
//! 同一组场景针对每个适配器展开一次，保证生命周期、装饰、释放、循环检测
//! 和单值解析策略在各引擎上表现一致。

mod support;

macro_rules! conformance_suite {
    ($engine:ident, $adapter:expr) => {
        mod $engine {
            use super::support;

            macro_rules! scenario {
                ($name:ident) => {
                    #[test]
                    fn $name() {
                        support::$name(&$adapter);
                    }
                };
            }

            macro_rules! concurrent_scenario {
                ($name:ident) => {
                    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
                    async fn $name() {
                        support::$name(&$adapter).await;
                    }
                };
            }

            scenario!(singleton_is_shared_across_scopes);
            scenario!(scoped_is_cached_per_scope);
            scenario!(transient_is_always_distinct);
            scenario!(decorators_apply_in_registration_order);
            scenario!(scope_disposes_in_reverse_creation_order);
            scenario!(root_disposes_singletons_in_reverse);
            scenario!(transient_disposables_belong_to_resolving_scope);
            scenario!(root_transient_disposables_held_until_root_disposal);
            scenario!(external_instances_are_never_disposed);
            scenario!(circular_dependency_fails_fast);
            scenario!(transient_services_share_singleton_logger);
            scenario!(resolve_all_keeps_registration_order);
            scenario!(last_registration_wins);
            scenario!(unregistered_contracts);
            scenario!(disposed_scope_rejects_resolution);
            scenario!(dispose_cascades_to_child_scopes);
            scenario!(scope_info_tracks_hierarchy);
            scenario!(scoped_from_root_rejected_when_validating);
            scenario!(scoped_from_root_cached_in_root);
            scenario!(factories_receive_current_scope);
            scenario!(singletons_resolve_against_root);
            scenario!(factory_errors_pass_through);
            scenario!(registration_modes_shape_resolution);
            scenario!(register_many_binds_each_contract);
            concurrent_scenario!(concurrent_singleton_created_once);
            concurrent_scenario!(concurrent_scopes_do_not_interfere);
        }
    };
}

conformance_suite!(builtin, di_impl::BuiltinAdapter);
conformance_suite!(lifetime_scope, di_lifetime_scope::LifetimeScopeAdapter);
conformance_suite!(nested, di_nested::NestedAdapter);
