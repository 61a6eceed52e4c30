use crate::{
    data::student::Student,
    error::StudentResult,
    maud_conveniences::{page, render_table, search_input},
    records::SearchCriteria,
    state::StudentState,
};
use axum::extract::{Query, State};
use maud::{Markup, html};

/// Read-only roster of every student, optionally narrowed with the same
/// criteria as `/student/search`.
pub async fn get_index_route(
    State(state): State<StudentState>,
    Query(criteria): Query<SearchCriteria>,
) -> StudentResult<Markup> {
    let form = html! {
        form method="get" action="/" class="flex flex-row items-end gap-4 mb-8" {
            (search_input("name", "Name", criteria.name.as_deref()))
            (search_input("phone", "Phone", criteria.phone.as_deref()))
            (search_input("email", "Email", criteria.email.as_deref()))
            button type="submit" class="bg-blue-500 hover:bg-blue-700 font-bold py-2 px-4 rounded" {"Search"}
        }
    };

    let students = state.search(without_blanks(criteria)).await?;
    let count = students.len();
    let rows = students.iter().map(student_row).collect();

    Ok(page(
        "Students",
        html! {
            (form)
            (render_table(
                html!{"Students " span class="text-gray-400" {"(" (count) ")"}},
                ["Photo", "Student ID", "Name", "City", "Phone", "Email"],
                rows,
            ))
        },
    ))
}

//the form always submits every input, so an untouched box means "not given"
fn without_blanks(SearchCriteria { name, phone, email }: SearchCriteria) -> SearchCriteria {
    let given = |value: Option<String>| value.filter(|value| !value.trim().is_empty());

    SearchCriteria {
        name: given(name),
        phone: given(phone),
        email: given(email),
    }
}

fn student_row(student: &Student) -> [Markup; 6] {
    let photo = match student.photo() {
        Some(photo) => html! {
            a href={"/student/photo/" (student.student_id)} target="_blank" {
                img src={"/student/photo/" (student.student_id)} alt=(photo.file_name.unwrap_or("photo")) class="w-12 h-12 object-cover rounded" {}
            }
        },
        None => html! { span class="italic text-gray-500" {"none"} },
    };

    [
        photo,
        html! { code {(student.student_id)} },
        html! {(student.student_name)},
        html! { @if let Some(city) = &student.student_city {(city)} },
        html! { @if let Some(phone) = student.student_phone {(phone)} },
        html! {
            @if let Some(email) = &student.student_email {
                a href={"mailto:" (email)} class="text-blue-300 underline" {(email)}
            }
        },
    ]
}
