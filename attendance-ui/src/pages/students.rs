//! Students Page
//!
//! Student list with a class filter, create/edit form, delete and photo
//! upload.

use leptos::*;
use wasm_bindgen::JsCast;
use web_sys::HtmlInputElement;

use crate::api;
use crate::api::types::{Student, StudentForm};
use crate::components::ListSkeleton;
use crate::state::{GlobalState, Lang, Msg};

/// Sorted distinct classes of a student list
pub fn classes_of(students: &[Student]) -> Vec<String> {
    let mut classes: Vec<String> = students.iter().map(|s| s.class.clone()).collect();
    classes.sort();
    classes.dedup();
    classes
}

fn confirm(message: &str) -> bool {
    web_sys::window()
        .and_then(|w| w.confirm_with_message(message).ok())
        .unwrap_or(false)
}

#[component]
pub fn Students() -> impl IntoView {
    let state = use_context::<GlobalState>().expect("GlobalState not found");
    let prefs = state.prefs;
    let lang = move || prefs.get().language;

    let students = create_rw_signal(None::<Vec<Student>>);
    let class_filter = create_rw_signal(String::new());
    // None: form hidden; Some(None): creating; Some(Some(id)): editing
    let editing = create_rw_signal(None::<Option<String>>);
    let form = create_rw_signal(StudentForm::default());
    let reload = create_rw_signal(0u32);

    let state_for_load = state.clone();
    create_effect(move |_| {
        let _ = reload.get();
        let state = state_for_load.clone();
        let Some(token) = state.token() else {
            return;
        };
        spawn_local(async move {
            match api::fetch_students(&token, None).await {
                Ok(list) => students.set(Some(list)),
                Err(e) => state.show_error(Msg::LoadFailed, &e),
            }
        });
    });

    let visible = move || {
        let filter = class_filter.get();
        students
            .get()
            .unwrap_or_default()
            .into_iter()
            .filter(|s| filter.is_empty() || s.class == filter)
            .collect::<Vec<_>>()
    };

    let state_for_save = state.clone();
    let on_save = move |ev: ev::SubmitEvent| {
        ev.prevent_default();
        let state = state_for_save.clone();
        let current = form.get();
        if current.missing_required() {
            state.show_error(Msg::RequiredFields, "");
            return;
        }
        let Some(token) = state.token() else {
            return;
        };
        let target = editing.get().flatten();
        spawn_local(async move {
            let result = match target {
                Some(id) => api::update_student(&token, &id, &current).await.map(|_| ()),
                None => api::create_student(&token, &current).await.map(|_| ()),
            };
            match result {
                Ok(()) => {
                    state.show_success(Msg::Saved);
                    editing.set(None);
                    reload.update(|n| *n += 1);
                }
                Err(e) => state.show_error(Msg::SaveFailed, &e),
            }
        });
    };

    let state_for_delete = state.clone();
    let on_delete = Callback::new(move |id: String| {
        let state = state_for_delete.clone();
        if !confirm(Msg::ConfirmDelete.text(state.lang())) {
            return;
        }
        let Some(token) = state.token() else {
            return;
        };
        spawn_local(async move {
            match api::delete_student(&token, &id).await {
                Ok(()) => {
                    state.show_success(Msg::Deleted);
                    reload.update(|n| *n += 1);
                }
                Err(e) => state.show_error(Msg::DeleteFailed, &e),
            }
        });
    });

    let on_edit = Callback::new(move |student: Student| {
        form.set(StudentForm::from(&student));
        editing.set(Some(Some(student.id)));
    });

    view! {
        <div class="space-y-6">
            <div class="flex items-center justify-between">
                <div>
                    <h1 class="text-3xl font-bold">{move || lang().pick("Học sinh", "Students")}</h1>
                    <p class="text-gray-400 mt-1">
                        {move || format!("{} {}", visible().len(), lang().pick("học sinh", "students"))}
                    </p>
                </div>
                <div class="flex items-center space-x-2">
                    <select
                        on:change=move |ev| class_filter.set(event_target_value(&ev))
                        class="bg-gray-700 rounded-lg px-4 py-2 border border-gray-600"
                    >
                        <option value="">{move || Msg::AllClasses.text(lang())}</option>
                        {move || classes_of(&students.get().unwrap_or_default())
                            .into_iter()
                            .map(|c| view! { <option value=c.clone()>{c.clone()}</option> })
                            .collect_view()}
                    </select>
                    <button
                        on:click=move |_| {
                            form.set(StudentForm::default());
                            editing.set(Some(None));
                        }
                        class="px-4 py-2 bg-primary-600 hover:bg-primary-700 rounded-lg font-medium transition-colors"
                    >
                        {move || lang().pick("Thêm học sinh", "Add student")}
                    </button>
                </div>
            </div>

            <Show when=move || editing.get().is_some()>
                <form on:submit=on_save.clone() class="bg-gray-800 rounded-xl p-6 grid md:grid-cols-2 gap-4">
                    <FormField label=Signal::derive(move || lang().pick("Mã học sinh *", "Student code *").to_string())
                        value=Signal::derive(move || form.get().student_code)
                        on_input=move |v: String| form.update(|f| f.student_code = v) />
                    <FormField label=Signal::derive(move || lang().pick("Họ tên *", "Name *").to_string())
                        value=Signal::derive(move || form.get().name)
                        on_input=move |v: String| form.update(|f| f.name = v) />
                    <FormField label=Signal::derive(move || lang().pick("Lớp *", "Class *").to_string())
                        value=Signal::derive(move || form.get().class)
                        on_input=move |v: String| form.update(|f| f.class = v) />
                    <FormField label=Signal::derive(move || lang().pick("Ngành", "Major").to_string())
                        value=Signal::derive(move || form.get().major)
                        on_input=move |v: String| form.update(|f| f.major = v) />
                    <FormField label=Signal::derive(|| "Email".to_string())
                        value=Signal::derive(move || form.get().email.unwrap_or_default())
                        on_input=move |v: String| form.update(|f| f.email = (!v.trim().is_empty()).then_some(v)) />
                    <FormField label=Signal::derive(move || lang().pick("Số điện thoại", "Phone").to_string())
                        value=Signal::derive(move || form.get().phone.unwrap_or_default())
                        on_input=move |v: String| form.update(|f| f.phone = (!v.trim().is_empty()).then_some(v)) />
                    <div class="md:col-span-2 flex justify-end space-x-2">
                        <button type="button" on:click=move |_| editing.set(None)
                            class="px-4 py-2 bg-gray-600 hover:bg-gray-500 rounded-lg">
                            {move || lang().pick("Hủy", "Cancel")}
                        </button>
                        <button type="submit" class="px-4 py-2 bg-primary-600 hover:bg-primary-700 rounded-lg font-medium">
                            {move || lang().pick("Lưu", "Save")}
                        </button>
                    </div>
                </form>
            </Show>

            <section class="bg-gray-800 rounded-xl p-6">
                {move || match students.get() {
                    None => view! { <ListSkeleton /> }.into_view(),
                    Some(_) => {
                        let rows = visible();
                        if rows.is_empty() {
                            view! { <p class="text-gray-400">{Msg::NoData.text(lang())}</p> }.into_view()
                        } else {
                            view! {
                                <table class="w-full text-left">
                                    <thead class="text-gray-400 text-sm">
                                        <tr>
                                            <th class="py-2"></th>
                                            <th>{lang().pick("Mã", "Code")}</th>
                                            <th>{lang().pick("Họ tên", "Name")}</th>
                                            <th>{lang().pick("Lớp", "Class")}</th>
                                            <th>{lang().pick("Ngành", "Major")}</th>
                                            <th></th>
                                        </tr>
                                    </thead>
                                    <tbody>
                                        {rows.into_iter().map(|s| view! {
                                            <StudentRow student=s lang=lang() on_edit=on_edit on_delete=on_delete reload=reload />
                                        }).collect_view()}
                                    </tbody>
                                </table>
                            }.into_view()
                        }
                    }
                }}
            </section>
        </div>
    }
}

#[component]
fn FormField(
    label: Signal<String>,
    value: Signal<String>,
    #[prop(into)] on_input: Callback<String>,
) -> impl IntoView {
    view! {
        <div>
            <label class="block text-sm text-gray-400 mb-2">{move || label.get()}</label>
            <input
                type="text"
                prop:value=move || value.get()
                on:input=move |ev| on_input.call(event_target_value(&ev))
                class="w-full bg-gray-700 rounded-lg px-4 py-2 border border-gray-600 focus:border-primary-500 focus:outline-none"
            />
        </div>
    }
}

#[component]
fn StudentRow(
    student: Student,
    lang: Lang,
    on_edit: Callback<Student>,
    on_delete: Callback<String>,
    reload: RwSignal<u32>,
) -> impl IntoView {
    let state = use_context::<GlobalState>().expect("GlobalState not found");
    let id = student.id.clone();

    let on_photo = move |ev: ev::Event| {
        let Some(file) = ev
            .target()
            .and_then(|t| t.dyn_into::<HtmlInputElement>().ok())
            .and_then(|input| input.files())
            .and_then(|files| files.get(0))
        else {
            return;
        };
        let state = state.clone();
        let Some(token) = state.token() else {
            return;
        };
        let id = id.clone();
        spawn_local(async move {
            match api::upload_photo(&token, &id, file).await {
                Ok(_) => {
                    state.show_success(Msg::PhotoUploaded);
                    reload.update(|n| *n += 1);
                }
                Err(e) => state.show_error(Msg::SaveFailed, &e),
            }
        });
    };

    let edit_target = student.clone();
    let delete_id = student.id.clone();

    view! {
        <tr class="border-t border-gray-700">
            <td class="py-2 w-12">
                {match student.photo_url.clone() {
                    Some(url) => view! { <img src=url class="w-10 h-10 rounded-full object-cover" /> }.into_view(),
                    None => view! { <div class="w-10 h-10 rounded-full bg-gray-700" /> }.into_view(),
                }}
            </td>
            <td class="font-mono text-sm">{student.student_code.clone()}</td>
            <td>
                <div>{student.name.clone()}</div>
                <div class="text-xs text-gray-500">{student.email.clone().unwrap_or_default()}</div>
            </td>
            <td>{student.class.clone()}</td>
            <td class="text-gray-400">{student.major.clone()}</td>
            <td class="text-right space-x-2 whitespace-nowrap">
                <label class="px-3 py-1 bg-gray-700 hover:bg-gray-600 rounded cursor-pointer text-sm">
                    {lang.pick("Ảnh", "Photo")}
                    <input type="file" accept="image/*" class="hidden" on:change=on_photo />
                </label>
                <button
                    on:click=move |_| on_edit.call(edit_target.clone())
                    class="px-3 py-1 bg-gray-700 hover:bg-gray-600 rounded text-sm"
                >
                    {lang.pick("Sửa", "Edit")}
                </button>
                <button
                    on:click=move |_| on_delete.call(delete_id.clone())
                    class="px-3 py-1 bg-red-700 hover:bg-red-600 rounded text-sm"
                >
                    {lang.pick("Xóa", "Delete")}
                </button>
            </td>
        </tr>
    }
}
