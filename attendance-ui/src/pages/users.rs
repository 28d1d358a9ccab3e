//! Users Page
//!
//! Account list with role counts, role filter, search, role changes and
//! bulk parent account creation.

use leptos::*;

use crate::api;
use crate::api::types::{Role, User, UserList};
use crate::components::{ListSkeleton, StatCard};
use crate::state::{GlobalState, Lang, Msg};

/// Summary line for a bulk account creation result
pub fn bulk_summary(lang: Lang, result: &serde_json::Value) -> String {
    let created = result["created"].as_array().map_or(0, Vec::len);
    let skipped = result["skipped"].as_u64().unwrap_or(0);
    let failed = result["failed"].as_array().map_or(0, Vec::len);
    match lang {
        Lang::Vi => format!("Đã tạo {}, bỏ qua {}, lỗi {}", created, skipped, failed),
        Lang::En => format!("Created {}, skipped {}, failed {}", created, skipped, failed),
    }
}

#[component]
pub fn Users() -> impl IntoView {
    let state = use_context::<GlobalState>().expect("GlobalState not found");
    let prefs = state.prefs;
    let lang = move || prefs.get().language;

    let role_filter = create_rw_signal(None::<Role>);
    let search = create_rw_signal(String::new());
    let list = create_rw_signal(None::<UserList>);
    let reload = create_rw_signal(0u32);
    let (bulk_result, set_bulk_result) = create_signal(None::<String>);

    let state_for_load = state.clone();
    create_effect(move |_| {
        let role = role_filter.get();
        let term = search.get().trim().to_string();
        let _ = reload.get();
        let state = state_for_load.clone();
        let Some(token) = state.token() else {
            return;
        };
        spawn_local(async move {
            let term = (!term.is_empty()).then_some(term);
            match api::fetch_users(&token, role, term).await {
                Ok(users) => list.set(Some(users)),
                Err(e) => state.show_error(Msg::LoadFailed, &e),
            }
        });
    });

    let state_for_bulk = state.clone();
    let on_bulk = move |_| {
        let state = state_for_bulk.clone();
        let Some(token) = state.token() else {
            return;
        };
        spawn_local(async move {
            match api::create_parent_accounts(&token).await {
                Ok(result) => {
                    set_bulk_result.set(Some(bulk_summary(state.lang(), &result)));
                    state.show_success(Msg::AccountsCreated);
                    reload.update(|n| *n += 1);
                }
                Err(e) => state.show_error(Msg::SaveFailed, &e),
            }
        });
    };

    let on_role = Callback::new(move |(uid, role): (String, Role)| {
        let state = state.clone();
        let Some(token) = state.token() else {
            return;
        };
        spawn_local(async move {
            match api::change_role(&token, &uid, role).await {
                Ok(_) => {
                    state.show_success(Msg::RoleChanged);
                    reload.update(|n| *n += 1);
                }
                Err(e) => state.show_error(Msg::SaveFailed, &e),
            }
        });
    });

    view! {
        <div class="space-y-6">
            <div class="flex flex-wrap items-center justify-between gap-4">
                <h1 class="text-3xl font-bold">{move || lang().pick("Người dùng", "Users")}</h1>
                <button
                    on:click=on_bulk
                    class="px-4 py-2 bg-primary-600 hover:bg-primary-700 rounded-lg font-medium transition-colors"
                >
                    {move || lang().pick("Tạo tài khoản phụ huynh", "Create parent accounts")}
                </button>
            </div>

            {move || bulk_result.get().map(|text| view! {
                <div class="bg-gray-800 rounded-lg p-3 text-sm text-gray-300">{text}</div>
            })}

            {move || {
                let l = lang();
                let counts = list.get().map(|u| u.counts).unwrap_or_default();
                view! {
                    <div class="grid grid-cols-2 md:grid-cols-4 gap-4">
                        <StatCard label=l.pick("Tổng", "Total").to_string() value=counts.total.to_string() icon="👥" />
                        <StatCard label=Role::Admin.label(l).to_string() value=counts.admin.to_string() icon="🛡" />
                        <StatCard label=Role::Teacher.label(l).to_string() value=counts.teacher.to_string() icon="🎓" />
                        <StatCard label=Role::Parent.label(l).to_string() value=counts.parent.to_string() icon="👪" />
                    </div>
                }
            }}

            <div class="flex flex-wrap gap-4 bg-gray-800 rounded-xl p-4">
                <input
                    type="search"
                    placeholder=move || Msg::Search.text(lang())
                    on:input=move |ev| search.set(event_target_value(&ev))
                    class="flex-1 bg-gray-700 rounded-lg px-3 py-2 border border-gray-600"
                />
                <select
                    on:change=move |ev| role_filter.set(Role::parse(&event_target_value(&ev)))
                    class="bg-gray-700 rounded-lg px-3 py-2 border border-gray-600"
                >
                    <option value="">{move || lang().pick("Tất cả vai trò", "All roles")}</option>
                    {move || Role::all().iter().map(|r| view! {
                        <option value=r.as_str()>{r.label(lang())}</option>
                    }).collect_view()}
                </select>
            </div>

            <section class="bg-gray-800 rounded-xl p-6">
                {move || match list.get() {
                    None => view! { <ListSkeleton /> }.into_view(),
                    Some(users) if users.users.is_empty() => view! {
                        <p class="text-gray-400">{Msg::NoData.text(lang())}</p>
                    }.into_view(),
                    Some(users) => {
                        let l = lang();
                        view! {
                            <table class="w-full text-left">
                                <thead class="text-gray-400 text-sm">
                                    <tr>
                                        <th class="py-2">{l.pick("Tên", "Name")}</th>
                                        <th>"Email"</th>
                                        <th>{l.pick("Lớp", "Class")}</th>
                                        <th>{l.pick("Đăng nhập gần nhất", "Last sign-in")}</th>
                                        <th>{l.pick("Vai trò", "Role")}</th>
                                    </tr>
                                </thead>
                                <tbody>
                                    {users.users.into_iter().map(|u| view! { <UserRow user=u lang=l on_role=on_role /> }).collect_view()}
                                </tbody>
                            </table>
                        }.into_view()
                    }
                }}
            </section>
        </div>
    }
}

#[component]
fn UserRow(user: User, lang: Lang, on_role: Callback<(String, Role)>) -> impl IntoView {
    let uid = user.uid.clone();
    let current = user.role;

    view! {
        <tr class="border-t border-gray-700">
            <td class="py-2">{user.display_name.clone()}</td>
            <td class="text-gray-400">{user.email.clone()}</td>
            <td>{user.school_id.clone().unwrap_or_default()}</td>
            <td class="text-sm text-gray-400">
                {user.last_login
                    .map(|t| t.with_timezone(&chrono::Local).format("%d/%m/%Y %H:%M").to_string())
                    .unwrap_or_else(|| "-".to_string())}
            </td>
            <td>
                <select
                    on:change=move |ev| {
                        if let Some(role) = Role::parse(&event_target_value(&ev)) {
                            if role != current {
                                on_role.call((uid.clone(), role));
                            }
                        }
                    }
                    class="bg-gray-700 rounded px-2 py-1 border border-gray-600 text-sm"
                >
                    {Role::all().iter().map(|r| view! {
                        <option value=r.as_str() selected={*r == current}>{r.label(lang)}</option>
                    }).collect_view()}
                </select>
            </td>
        </tr>
    }
}
